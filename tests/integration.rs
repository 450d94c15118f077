//! Integration tests for SaleScope

use std::io::Write;
use std::path::Path;

use salescope::{aggregate, clean, compute_rfm, load, viz, Aggregate, LoadError, SchemaError};
use tempfile::{tempdir, NamedTempFile};

const HEADER: &str = "ORDERNUMBER,QUANTITYORDERED,PRICEEACH,ORDERLINENUMBER,SALES,ORDERDATE,STATUS,QTR_ID,MONTH_ID,YEAR_ID,PRODUCTLINE,MSRP,PRODUCTCODE,CUSTOMERNAME,PHONE,ADDRESSLINE1,ADDRESSLINE2,CITY,STATE,POSTALCODE,COUNTRY,TERRITORY,CONTACTLASTNAME,CONTACTFIRSTNAME,DEALSIZE";

/// Create a test CSV file with sample data in the reference dataset's shape.
fn create_test_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();

    // Customer "Land of Toys Inc." - two orders, three lines
    writeln!(file, "10107,30,95.70,2,2871.00,2/24/2003 0:00,Shipped,1,2,2003,Motorcycles,95,S10_1678,Land of Toys Inc.,2125557818,897 Long Airport Avenue,,NYC,NY,10022,USA,NA,Yu,Kwai,Small").unwrap();
    writeln!(file, "10107,41,83.26,1,3413.66,2/24/2003 0:00,Shipped,1,2,2003,Classic Cars,120,S18_2325,Land of Toys Inc.,2125557818,897 Long Airport Avenue,,NYC,NY,10022,USA,NA,Yu,Kwai,Medium").unwrap();
    writeln!(file, "10121,34,81.35,5,2765.90,5/7/2003 0:00,Shipped,2,5,2003,Motorcycles,95,S10_1678,Land of Toys Inc.,2125557818,897 Long Airport Avenue,,NYC,NY,10022,USA,NA,Yu,Kwai,Small").unwrap();

    // Customer in France, later in the year
    writeln!(file, "10134,41,94.74,2,3884.34,7/1/2003 0:00,Shipped,3,7,2003,Classic Cars,173,S18_1342,Lyon Souveniers,+33 1 46 62 7555,27 rue du Colonel Pierre Avia,,Paris,,75508,France,EMEA,Da Cunha,Daniel,Medium").unwrap();

    // Customer in Norway, high value, most recent
    writeln!(file, "10168,36,96.66,1,9479.76,10/28/2003 0:00,Shipped,4,10,2003,Trucks and Buses,136,S12_1666,Baane Mini Imports,07-98 9555,Erling Skakkes gate 78,,Stavern,,4110,Norway,EMEA,Bergulfsen,Jonas,Large").unwrap();

    file
}

#[test]
fn test_end_to_end_pipeline() {
    let test_file = create_test_csv();
    let table = load(test_file.path(), "ISO-8859-1").unwrap();
    let dataset = clean(&table).unwrap();
    assert_eq!(dataset.len(), 5);

    let result = aggregate(&dataset, 5);
    assert_eq!(result.len(), 8);

    let dir = tempdir().unwrap();
    let artifacts = viz::render_report(&result, dir.path()).unwrap();
    assert_eq!(artifacts.len(), 7);
    for path in &artifacts {
        assert!(path.exists(), "{} was not written", path.display());
    }
}

#[test]
fn test_no_duplicate_order_product_pairs() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();
    // Exact duplicate pair: same order number and product line
    let row = "1,2,10.00,1,20.00,1/5/2023 0:00,Shipped,1,1,2023,Motorcycles,95,S10_1,Acme,555,Street,,NYC,NY,10022,USA,NA,Doe,Jane,Small";
    writeln!(file, "{row}").unwrap();
    writeln!(file, "{row}").unwrap();

    let table = load(file.path(), "utf-8").unwrap();
    let dataset = clean(&table).unwrap();

    assert_eq!(dataset.len(), 1);
    assert_eq!(dataset.stats.duplicates_removed, 1);

    let result = aggregate(&dataset, 5);
    match result.get("total_sales").unwrap() {
        Aggregate::Scalar(total) => assert!((total - 20.0).abs() < 1e-9),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_negative_quantity_dropped_and_counted() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();
    writeln!(file, "1,-1,10.00,1,10.00,1/5/2023 0:00,Shipped,1,1,2023,Motorcycles,95,S10_1,Acme,555,Street,,NYC,NY,10022,USA,NA,Doe,Jane,Small").unwrap();
    writeln!(file, "2,3,10.00,1,30.00,1/5/2023 0:00,Shipped,1,1,2023,Motorcycles,95,S10_1,Acme,555,Street,,NYC,NY,10022,USA,NA,Doe,Jane,Small").unwrap();

    let table = load(file.path(), "utf-8").unwrap();
    let dataset = clean(&table).unwrap();

    assert_eq!(dataset.len(), 1);
    assert_eq!(dataset.stats.dropped_nonpositive_qty, 1);
    assert!(dataset.records.iter().all(|r| r.quantity > 0));
}

#[test]
fn test_country_totals_match_overall_total() {
    let test_file = create_test_csv();
    let table = load(test_file.path(), "ISO-8859-1").unwrap();
    let dataset = clean(&table).unwrap();
    let result = aggregate(&dataset, 5);

    let total = match result.get("total_sales").unwrap() {
        Aggregate::Scalar(v) => *v,
        other => panic!("unexpected {other:?}"),
    };
    let by_country = match result.get("sales_by_country").unwrap() {
        Aggregate::Series(s) => s,
        other => panic!("unexpected {other:?}"),
    };

    let summed: f64 = by_country.iter().map(|(_, v)| v).sum();
    assert!((summed - total).abs() < 1e-6);
}

#[test]
fn test_empty_dataset_yields_no_data_everywhere() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();
    // Every row is invalid, so the cleaned dataset comes out empty.
    writeln!(file, "1,-5,10.00,1,10.00,1/5/2023 0:00,Shipped,1,1,2023,Motorcycles,95,S10_1,Acme,555,Street,,NYC,NY,10022,USA,NA,Doe,Jane,Small").unwrap();
    writeln!(file, "2,3,10.00,1,30.00,not-a-date,Shipped,1,1,2023,Motorcycles,95,S10_1,Acme,555,Street,,NYC,NY,10022,USA,NA,Doe,Jane,Small").unwrap();

    let table = load(file.path(), "utf-8").unwrap();
    let dataset = clean(&table).unwrap();
    assert!(dataset.is_empty());

    let result = aggregate(&dataset, 5);
    for (name, metric) in result.iter() {
        assert!(metric.is_no_data(), "{name} should report no data");
    }

    // Rendering an all-NoData result writes nothing and does not fail.
    let dir = tempdir().unwrap();
    let artifacts = viz::render_report(&result, dir.path()).unwrap();
    assert!(artifacts.is_empty());
}

#[test]
fn test_rfm_monetary_monotonic_in_spend() {
    let test_file = create_test_csv();
    let table = load(test_file.path(), "ISO-8859-1").unwrap();
    let dataset = clean(&table).unwrap();

    let mut rfm = compute_rfm(&dataset);
    assert_eq!(rfm.len(), 3);

    rfm.sort_by(|a, b| a.monetary.partial_cmp(&b.monetary).unwrap());
    assert!(rfm.windows(2).all(|w| w[0].m_score <= w[1].m_score));
}

#[test]
fn test_missing_file_is_load_error() {
    let err = load(Path::new("definitely_missing.csv"), "utf-8").unwrap_err();
    assert!(err.downcast_ref::<LoadError>().is_some());
}

#[test]
fn test_missing_headers_is_schema_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "ORDERNUMBER,SALES,COUNTRY").unwrap();
    writeln!(file, "1,100.0,USA").unwrap();

    let table = load(file.path(), "utf-8").unwrap();
    let err = clean(&table).unwrap_err();
    let schema = err.downcast_ref::<SchemaError>().unwrap();
    assert!(schema.missing.contains(&"ORDERDATE".to_string()));
    assert!(schema.missing.contains(&"QUANTITYORDERED".to_string()));
}

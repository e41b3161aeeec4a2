//! Integration tests for the harvester
//!
//! These tests use wiremock to stand up a mock Northgate portal and run
//! full harvests end-to-end against a temporary SQLite database.

use chrono::NaiveDate;
use northgate_harvest::config::{
    validate, Config, CrawlerConfig, OutputConfig, PortalConfig, SearchConfig,
};
use northgate_harvest::crawler::run_harvest_on;
use northgate_harvest::model::Application;
use northgate_harvest::storage::{open_store, IngestStore, RunStatus, SqliteStore};
use northgate_harvest::{ConfigError, HarvestError};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH_PATH: &str = "/Northgate/PlanningExplorerAA/GeneralSearch.aspx";
const GENERIC_PATH: &str = "/Northgate/PlanningExplorerAA/Generic/";

const SEARCH_FORM: &str = r#"<html><body><form method="post">
    <input type="hidden" name="__VIEWSTATE" id="__VIEWSTATE" value="dDwtMTA4MzQ=" />
    <input type="hidden" name="__VIEWSTATEGENERATOR" id="__VIEWSTATEGENERATOR" value="C9A3B0B1" />
    <input type="hidden" name="__EVENTVALIDATION" id="__EVENTVALIDATION" value="wEWBALx" />
</form></body></html>"#;

/// One application as the mock portal shows it
struct PortalApp {
    reference: &'static str,
    param: &'static str,
    received: &'static str,
    applicant: &'static str,
}

const FIRST: PortalApp = PortalApp {
    reference: "24/P1001",
    param: "1001",
    received: "05-06-2024",
    applicant: "Mr A Smith",
};

const SECOND: PortalApp = PortalApp {
    reference: "24/P1002",
    param: "1002",
    received: "--",
    applicant: "Ms B Jones",
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

/// Creates a test configuration pointed at the mock portal
fn create_test_config(server: &MockServer, db_path: &Path) -> Config {
    Config {
        portal: PortalConfig {
            site_url: server.uri(),
            ..Default::default()
        },
        crawler: CrawlerConfig {
            delay_seconds: 0.0,
            user_agent: Some("TestHarvester/1.0".to_string()),
            timeout_seconds: 5,
        },
        search: SearchConfig {
            days: Some(14),
            ..Default::default()
        },
        output: OutputConfig {
            database_path: db_path.to_string_lossy().into_owned(),
        },
        ..Default::default()
    }
}

fn listing_page(apps: &[&PortalApp]) -> String {
    let mut html = String::from(
        r#"<html><body><table class="display_table">
        <tr><th>Application Number</th><th>Site Address</th><th>Proposal</th>
            <th>Status</th><th>Date Registered</th><th>Decision</th></tr>"#,
    );
    for app in apps {
        html.push_str(&format!(
            r#"<tr><td><a href="StdDetails.aspx?PT=Planning%20Applications&amp;PARAM0={}%0D%0A">{}</a></td>
            <td>{} High Street, Wimbledon</td><td>Single storey rear extension</td>
            <td>Pending Consideration</td><td>{}</td><td>&nbsp;</td></tr>"#,
            app.param, app.reference, app.param, app.received
        ));
    }
    html.push_str("</table></body></html>");
    html
}

fn details_page(app: &PortalApp) -> String {
    let item = |label: &str, value: &str| {
        format!("<li><div>\n\t<span>{}</span>\n\t{}\n</div></li>", label, value)
    };

    let mut html = String::from(r#"<html><body><ul class="list">"#);
    for (label, value) in [
        ("Application Registered", app.received),
        ("Status", "Pending Consideration"),
        ("Comments Until", "18-04-2024"),
        ("Recommendation", " "),
        ("Date of Committee", "Not Available"),
        ("Decision", " "),
        ("Appeal Lodged", " "),
        ("Appeal Decision", " "),
    ] {
        html.push_str(&item(label, value));
    }
    html.push_str(r#"</ul><ul class="list">"#);
    for (label, value) in [
        ("Application Number", app.reference),
        ("Site Address", "1 High Street"),
        ("Application Type", "Full Application"),
        ("Development Type", "Minor"),
        ("Proposal", "Rear extension"),
        ("Applicant", app.applicant),
        ("Agent", "Acme Architects Ltd"),
        ("Wards", "Wimbledon Park"),
        ("Location Co ordinates", "Easting: 526421 Northing: 170944"),
        ("Appeal Submitted?", "No"),
        ("Appeal Decision", " "),
        ("Case Officer / Tel", "4402089864226"),
        ("Division", "Development Control"),
        ("Planning Officer", "Jane Doe"),
        ("Determination Level", "Delegated"),
        ("Existing Land Use", "Residential"),
        ("Proposed Land Use", "Residential"),
    ] {
        html.push_str(&item(label, value));
    }
    html.push_str("</ul><ul>");
    for page in [
        "StdDocuments",
        "StdKeyDates",
        "StdChecks",
        "StdMeetings",
        "StdConstraints",
    ] {
        html.push_str(&format!(
            r#"<li><a class="FooterLinks" href="{}.aspx?PARAM0={}">Link</a></li>"#,
            page, app.param
        ));
    }
    html.push_str("</ul></body></html>");
    html
}

fn dates_page(app: &PortalApp) -> String {
    let mut html = String::from(r#"<html><body><div class="dataview"><ul>"#);
    for (i, value) in [
        app.received,
        "Not Applicable",
        "06-06-2024",
        "07-06-2024",
        "05-06-2024",
        "01-07-2024",
        "06-06-2024",
        "31-07-2024",
        "01-07-2024",
        "",
        "10-06-2024",
        "",
    ]
    .iter()
    .enumerate()
    {
        html.push_str(&format!(
            "<li><div><span>Milestone {}</span>{}</div></li>",
            i, value
        ));
    }
    html.push_str("</ul></div></body></html>");
    html
}

fn documents_page(app: &PortalApp) -> String {
    format!(
        r#"<html><body><table id="tblContent">
        <tr><th>Document</th></tr>
        <tr><td><a href="/Northgate/ImageViewer/Doc.aspx?ref={p}&amp;id=1">Site Plan</a></td></tr>
        <tr><td><a href="/Northgate/ImageViewer/Doc.aspx?ref={p}&amp;id=2">Application Form</a></td></tr>
        </table></body></html>"#,
        p = app.param
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

/// Mounts the search handshake returning a listing of `apps`
async fn mount_search(server: &MockServer, apps: &[&PortalApp]) {
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(html(SEARCH_FORM.to_string()))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_string_contains("__VIEWSTATE=dDwtMTA4MzQ%3D"))
        .and(body_string_contains("rbGroup=rbDay"))
        .respond_with(ResponseTemplate::new(302).insert_header(
            "Location",
            "/Northgate/PlanningExplorerAA/Generic/StdResults.aspx?PT=Planning%20Applications&PS=10",
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{}StdResults.aspx", GENERIC_PATH)))
        .and(query_param("PS", "99999"))
        .respond_with(html(listing_page(apps)))
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, page: &str, app: &PortalApp, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("{}{}.aspx", GENERIC_PATH, page)))
        .and(query_param("PARAM0", app.param))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Mounts every secondary page of `app`
async fn mount_app(server: &MockServer, app: &PortalApp) {
    mount_page(server, "StdDetails", app, html(details_page(app))).await;
    mount_page(server, "StdKeyDates", app, html(dates_page(app))).await;
    mount_page(server, "StdDocuments", app, html(documents_page(app))).await;
}

/// Starts a portal listing both applications with all pages served
async fn full_portal() -> MockServer {
    let server = MockServer::start().await;
    mount_search(&server, &[&FIRST, &SECOND]).await;
    mount_app(&server, &FIRST).await;
    mount_app(&server, &SECOND).await;
    server
}

fn open(config: &Config) -> SqliteStore {
    open_store(Path::new(&config.output.database_path)).expect("Failed to open store")
}

#[tokio::test]
async fn test_full_harvest() {
    let server = full_portal().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir.path().join("data.sqlite"));

    let summary = run_harvest_on(&config, day(10))
        .await
        .expect("Harvest failed");

    assert_eq!(summary.listed, 2);
    assert_eq!(summary.details.succeeded, 2);
    assert_eq!(summary.dates.succeeded, 2);
    assert_eq!(summary.documents.succeeded, 2);
    assert_eq!(summary.total_failed(), 0);

    let store = open(&config);
    assert_eq!(store.count_applications().unwrap(), 2);
    assert_eq!(store.count_documents().unwrap(), 4);

    let app = store.get_application(FIRST.reference).unwrap().unwrap();
    assert_eq!(
        app.info_url,
        Some(format!(
            "{}{}StdDetails.aspx?PT=Planning%20Applications&PARAM0=1001",
            server.uri(),
            GENERIC_PATH
        ))
    );
    assert_eq!(app.address.as_deref(), Some("1001 High Street, Wimbledon"));
    assert_eq!(app.decision, None);
    assert_eq!(app.la_name.as_deref(), Some("Merton Borough Council"));
    assert_eq!(app.applicant_name.as_deref(), Some("Mr A Smith"));
    assert_eq!(app.case_officer_phone.as_deref(), Some("02089864226"));
    assert_eq!((app.easting, app.northing), (Some(526421), Some(170944)));

    let latitude = app.latitude.unwrap();
    let longitude = app.longitude.unwrap();
    assert!((49.0..61.0).contains(&latitude));
    assert!((-8.0..2.0).contains(&longitude));

    assert_eq!(app.date_received, Some(day(5)));
    assert_eq!(app.target_date, NaiveDate::from_ymd_opt(2024, 7, 31));
    assert_eq!(app.date_first_advertised, None);
    assert_eq!(app.documents_qty, Some(2));
    assert_eq!(app.date_scraped, Some(day(10)));
    assert_eq!(app.date_details_scraped, Some(day(10)));
    assert_eq!(app.date_dates_scraped, Some(day(10)));
    assert_eq!(app.date_documents_scraped, Some(day(10)));

    let documents = store.documents_for(FIRST.reference).unwrap();
    assert_eq!(documents.len(), 2);
    assert!(documents[0]
        .url
        .starts_with(&format!("{}/Northgate/ImageViewer/", server.uri())));

    let run = store.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.run_date, day(10));
}

#[tokio::test]
async fn test_placeholder_date_stored_as_null() {
    let server = full_portal().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir.path().join("data.sqlite"));

    run_harvest_on(&config, day(10)).await.unwrap();

    let store = open(&config);
    let app = store.get_application(SECOND.reference).unwrap().unwrap();
    assert_eq!(app.date_received, None);
    assert_eq!(app.date_details_scraped, Some(day(10)));
    assert_eq!(app.date_dates_scraped, Some(day(10)));
}

#[tokio::test]
async fn test_second_run_same_day_is_idempotent() {
    let server = full_portal().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir.path().join("data.sqlite"));

    run_harvest_on(&config, day(10)).await.unwrap();
    let before: Vec<Application> = [FIRST.reference, SECOND.reference]
        .iter()
        .map(|reference| open(&config).get_application(reference).unwrap().unwrap())
        .collect();

    let summary = run_harvest_on(&config, day(10)).await.unwrap();
    assert_eq!(summary.listed, 2);
    assert_eq!(summary.details.attempted, 0);
    assert_eq!(summary.dates.attempted, 0);
    assert_eq!(summary.documents.attempted, 0);

    let store = open(&config);
    assert_eq!(store.count_applications().unwrap(), 2);
    assert_eq!(store.count_documents().unwrap(), 4);

    for expected in &before {
        let mut after = store
            .get_application(&expected.council_reference)
            .unwrap()
            .unwrap();
        after.updated_at = expected.updated_at.clone();
        assert_eq!(&after, expected);
    }
}

#[tokio::test]
async fn test_next_day_refreshes_without_duplicates() {
    let server = full_portal().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir.path().join("data.sqlite"));

    run_harvest_on(&config, day(10)).await.unwrap();
    let summary = run_harvest_on(&config, day(11)).await.unwrap();

    assert_eq!(summary.details.succeeded, 2);
    assert_eq!(summary.dates.succeeded, 2);
    assert_eq!(summary.documents.succeeded, 2);

    let store = open(&config);
    assert_eq!(store.count_documents().unwrap(), 4);
    let app = store.get_application(FIRST.reference).unwrap().unwrap();
    assert_eq!(app.date_details_scraped, Some(day(11)));
    let documents = store.documents_for(FIRST.reference).unwrap();
    assert!(documents.iter().all(|doc| doc.date_last_seen == day(11)));
}

#[tokio::test]
async fn test_failed_detail_page_keeps_previous_fields() {
    let server = full_portal().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir.path().join("data.sqlite"));

    run_harvest_on(&config, day(10)).await.unwrap();

    // Next day the first application's details page errors
    server.reset().await;
    mount_search(&server, &[&FIRST, &SECOND]).await;
    mount_page(&server, "StdDetails", &FIRST, ResponseTemplate::new(500)).await;
    mount_page(&server, "StdKeyDates", &FIRST, html(dates_page(&FIRST))).await;
    mount_page(&server, "StdDocuments", &FIRST, html(documents_page(&FIRST))).await;
    mount_app(&server, &SECOND).await;

    let summary = run_harvest_on(&config, day(11))
        .await
        .expect("One bad page must not fail the run");

    assert_eq!(summary.details.attempted, 2);
    assert_eq!(summary.details.failed, 1);
    assert_eq!(summary.details.succeeded, 1);
    assert_eq!(summary.dates.succeeded, 2);

    let store = open(&config);
    let failed = store.get_application(FIRST.reference).unwrap().unwrap();
    assert_eq!(failed.date_details_scraped, Some(day(10)));
    assert_eq!(failed.applicant_name.as_deref(), Some("Mr A Smith"));
    assert_eq!(failed.easting, Some(526421));
    assert_eq!(failed.date_dates_scraped, Some(day(11)));

    let ok = store.get_application(SECOND.reference).unwrap().unwrap();
    assert_eq!(ok.date_details_scraped, Some(day(11)));

    let run = store.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.summary.details.failed, 1);
}

#[tokio::test]
async fn test_empty_listing_processes_known_records() {
    let server = MockServer::start().await;
    mount_search(&server, &[&FIRST]).await;
    mount_page(&server, "StdDetails", &FIRST, ResponseTemplate::new(503)).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir.path().join("data.sqlite"));

    let summary = run_harvest_on(&config, day(10)).await.unwrap();
    assert_eq!(summary.details.failed, 1);

    // Same day, nothing listed, but the first application is still owed
    server.reset().await;
    mount_search(&server, &[]).await;
    mount_app(&server, &FIRST).await;

    let summary = run_harvest_on(&config, day(10)).await.unwrap();
    assert_eq!(summary.listed, 0);
    assert_eq!(summary.details.attempted, 1);
    assert_eq!(summary.details.succeeded, 1);
    assert_eq!(summary.dates.succeeded, 1);
    assert_eq!(summary.documents.succeeded, 1);

    let store = open(&config);
    let app = store.get_application(FIRST.reference).unwrap().unwrap();
    assert_eq!(app.date_details_scraped, Some(day(10)));
    assert_eq!(app.documents_qty, Some(2));
}

#[tokio::test]
async fn test_search_form_error_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir.path().join("data.sqlite"));

    let err = run_harvest_on(&config, day(10)).await.unwrap_err();
    assert!(matches!(err, HarvestError::Session(_)));
    assert!(err.is_setup_failure());

    let store = open(&config);
    assert_eq!(store.count_applications().unwrap(), 0);
    let run = store.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
}

#[tokio::test]
async fn test_search_post_without_redirect_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(html(SEARCH_FORM.to_string()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(html("<html>Your session has expired</html>".to_string()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir.path().join("data.sqlite"));

    let err = run_harvest_on(&config, day(10)).await.unwrap_err();
    assert!(matches!(err, HarvestError::Session(_)));
    assert_eq!(open(&config).count_applications().unwrap(), 0);
}

#[tokio::test]
async fn test_missing_search_window_rejected_before_network() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir.path().join("data.sqlite"));
    config.search = SearchConfig::default();

    assert!(matches!(
        validate(&config),
        Err(ConfigError::MissingSearchWindow)
    ));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

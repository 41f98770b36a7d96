use super::types::{PublishRecord, PublishStatus, PublishSummary};
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::Path;

/// JUnit XML of one publish run; each record is a `<testcase>`
pub fn generate_junit_xml(summary: &PublishSummary) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let tests = summary.records.len().to_string();
    let failures = summary.count(PublishStatus::Failed).to_string();
    let skipped = summary.count(PublishStatus::Skipped).to_string();
    let session = summary.session_name.as_deref().unwrap_or("testbench-publish");

    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "testbench-reporter"));
    suites_start.push_attribute(("tests", tests.as_str()));
    suites_start.push_attribute(("failures", failures.as_str()));
    suites_start.push_attribute(("skipped", skipped.as_str()));
    writer.write_event(Event::Start(suites_start))?;

    let mut suite_start = BytesStart::new("testsuite");
    suite_start.push_attribute(("name", session));
    suite_start.push_attribute(("tests", tests.as_str()));
    suite_start.push_attribute(("failures", failures.as_str()));
    suite_start.push_attribute(("skipped", skipped.as_str()));
    suite_start.push_attribute(("timestamp", summary.generated_at.as_str()));
    writer.write_event(Event::Start(suite_start))?;

    for record in &summary.records {
        write_test_case(&mut writer, record)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let xml = String::from_utf8(writer.into_inner().into_inner())?;
    Ok(xml)
}

fn write_test_case<W: std::io::Write>(writer: &mut Writer<W>, record: &PublishRecord) -> Result<()> {
    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", record.name.as_str()));
    case_start.push_attribute(("classname", record.external_id.as_str()));
    writer.write_event(Event::Start(case_start))?;

    let message = record.message.as_deref().unwrap_or_default();
    match record.status {
        PublishStatus::Published => {}
        PublishStatus::Skipped => {
            let mut skipped = BytesStart::new("skipped");
            skipped.push_attribute(("message", message));
            writer.write_event(Event::Empty(skipped))?;
        }
        PublishStatus::Failed => {
            let mut failure = BytesStart::new("failure");
            failure.push_attribute(("message", message));
            failure.push_attribute(("type", "PublishError"));
            writer.write_event(Event::Start(failure))?;
            writer.write_event(Event::Text(BytesText::new(message)))?;
            writer.write_event(Event::End(BytesEnd::new("failure")))?;
        }
    }

    if let Some(execution_id) = record.execution_id {
        let out = format!("execution {}", execution_id);
        writer.write_event(Event::Start(BytesStart::new("system-out")))?;
        writer.write_event(Event::Text(BytesText::new(&out)))?;
        writer.write_event(Event::End(BytesEnd::new("system-out")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

/// Write the report to `output_dir/junit.xml`
pub fn write_report(summary: &PublishSummary, output_dir: &Path) -> Result<()> {
    let xml = generate_junit_xml(summary)?;
    let path = output_dir.join("junit.xml");
    std::fs::write(&path, xml)?;
    log::info!("JUnit report saved to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TestCaseDefinition, Verdict};

    fn summary() -> PublishSummary {
        let login = TestCaseDefinition::new("T-1", "Login");
        let logout = TestCaseDefinition::new("T-2", "Logout");
        let search = TestCaseDefinition::new("T-3", "Search");

        let mut published = PublishRecord::new(&login, Some(Verdict::Passed));
        published.execution_id = Some(42);

        PublishSummary {
            session_name: Some("CYPRESS_2024-03-01T09:30:05.000Z".to_string()),
            records: vec![
                published,
                PublishRecord::new(&logout, Some(Verdict::Passed))
                    .skipped("test case 'T-2' has no external id".to_string()),
                PublishRecord::new(&search, Some(Verdict::Failed))
                    .failed("createExecution failed".to_string()),
            ],
            generated_at: "2024-03-01T09:31:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_generate_junit_xml() {
        let xml = generate_junit_xml(&summary()).expect("Failed to generate XML");

        assert!(xml.contains(r#"<testsuites name="testbench-reporter""#));
        assert!(xml.contains(r#"tests="3""#));
        assert!(xml.contains(r#"failures="1""#));
        assert!(xml.contains(r#"skipped="1""#));
        assert!(xml.contains(r#"<testsuite name="CYPRESS_2024-03-01T09:30:05.000Z""#));
        assert!(xml.contains(r#"<testcase name="Login" classname="T-1">"#));
        assert!(xml.contains("<system-out>execution 42</system-out>"));
        assert!(xml.contains("<skipped message="));
        assert!(xml.contains(r#"has no external id"/>"#));
        assert!(xml.contains(r#"message="createExecution failed""#));
    }

    #[test]
    fn test_write_reports() {
        let dir = tempfile::tempdir().unwrap();
        crate::report::write_reports(&summary(), dir.path()).unwrap();

        let json = std::fs::read_to_string(dir.path().join("publish.json")).unwrap();
        assert!(json.contains("\"externalId\": \"T-1\""));
        assert!(json.contains("\"status\": \"Skipped\""));
        assert!(dir.path().join("junit.xml").exists());
    }
}

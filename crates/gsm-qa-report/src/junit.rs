//! JUnit XML Report Generator
//!
//! Generates JUnit-compatible XML from a result store for CI/CD integration.
//! Every case of a parametrized test becomes its own `<testcase>`, named
//! `test_id[param]`.

use gsm_qa_runner::{Outcome, Parametrized, SuiteResult, TestCaseResult, location};
use std::io::Write;

use crate::error::Result;

/// JUnit XML report generator
#[derive(Debug)]
pub struct JunitReport {
    /// Test suite name
    suite_name: String,
    /// Test class name
    class_name: String,
}

/// One `<testcase>` element
struct JunitCase<'a> {
    name: String,
    outcome: Outcome,
    duration: f64,
    message: Option<&'a str>,
}

impl JunitReport {
    /// Create a new JUnit report generator
    #[must_use]
    pub fn new(suite_name: impl Into<String>) -> Self {
        let name = suite_name.into();
        Self {
            class_name: name.clone(),
            suite_name: name,
        }
    }

    /// Set the class name for test cases
    #[must_use]
    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }

    /// Generate JUnit XML from a result
    ///
    /// # Errors
    ///
    /// Returns an error if XML generation fails.
    pub fn generate(&self, result: &SuiteResult) -> Result<String> {
        let mut output = Vec::new();
        self.write_xml(&mut output, result)?;
        Ok(String::from_utf8_lossy(&output).to_string())
    }

    fn cases<'a>(id: &str, case: &'a TestCaseResult) -> Vec<JunitCase<'a>> {
        let params: Vec<Option<&str>> = match &case.result {
            Parametrized::Single(_) => vec![None],
            Parametrized::Params(map) => map.keys().map(|p| Some(p.as_str())).collect(),
        };
        params
            .into_iter()
            .filter_map(|param| {
                let outcome = *case.result.get(param)?;
                Some(JunitCase {
                    name: location(id, param),
                    outcome,
                    duration: case.duration.get(param).copied().unwrap_or(0.0),
                    message: case
                        .message
                        .as_ref()
                        .and_then(|m| m.get(param))
                        .map(String::as_str),
                })
            })
            .collect()
    }

    /// Write JUnit XML to a writer
    fn write_xml<W: Write>(&self, writer: &mut W, result: &SuiteResult) -> Result<()> {
        let cases: Vec<JunitCase<'_>> = result
            .tests
            .iter()
            .flat_map(|(id, case)| Self::cases(id, case))
            .collect();
        let count = |outcome: Outcome| cases.iter().filter(|c| c.outcome == outcome).count();
        let time: f64 = cases.iter().map(|c| c.duration).sum();

        writeln!(writer, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(
            writer,
            r#"<testsuite name="{}" tests="{}" failures="{}" errors="{}" skipped="{}" time="{:.3}">"#,
            Self::escape_xml(&self.suite_name),
            cases.len(),
            count(Outcome::Failed),
            count(Outcome::Error),
            count(Outcome::Skipped),
            time
        )?;

        if let Some(score) = &result.score {
            writeln!(writer, "  <properties>")?;
            writeln!(
                writer,
                r#"    <property name="score.total" value="{:.4}"/>"#,
                score.total_score
            )?;
            for section in &score.sections {
                writeln!(
                    writer,
                    r#"    <property name="score.{}" value="{:.4}"/>"#,
                    Self::escape_xml(&section.section),
                    section.score
                )?;
            }
            writeln!(writer, "  </properties>")?;
        }

        for case in &cases {
            self.write_testcase(writer, case)?;
        }

        writeln!(writer, "</testsuite>")?;
        Ok(())
    }

    /// Write a single test case
    fn write_testcase<W: Write>(&self, writer: &mut W, case: &JunitCase<'_>) -> Result<()> {
        writeln!(
            writer,
            r#"  <testcase classname="{}" name="{}" time="{:.3}">"#,
            Self::escape_xml(&self.class_name),
            Self::escape_xml(&case.name),
            case.duration
        )?;

        let message = Self::escape_xml(case.message.unwrap_or_default());
        match case.outcome {
            Outcome::Passed => {}
            Outcome::Failed => {
                writeln!(
                    writer,
                    r#"    <failure message="{message}" type="AssertionError"/>"#
                )?;
            }
            Outcome::Error => {
                writeln!(writer, r#"    <error message="{message}" type="CheckError"/>"#)?;
            }
            Outcome::Skipped => {
                writeln!(writer, r#"    <skipped message="{message}"/>"#)?;
            }
        }

        writeln!(writer, "  </testcase>")?;
        Ok(())
    }

    /// Escape XML special characters
    fn escape_xml(s: &str) -> String {
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&apos;")
    }
}

impl Default for JunitReport {
    fn default() -> Self {
        Self::new("gsm-qa")
    }
}

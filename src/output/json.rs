use crate::manifest::VerificationReport;
use anyhow::Result;

pub fn print_json(report: &VerificationReport) -> Result<()> {
    let json = serde_json::to_string_pretty(&JsonReport::from(report))?;
    println!("{}", json);
    Ok(())
}

#[derive(serde::Serialize)]
pub(crate) struct JsonReport<'a> {
    passed: bool,
    #[serde(flatten)]
    report: &'a VerificationReport,
}

impl<'a> From<&'a VerificationReport> for JsonReport<'a> {
    fn from(report: &'a VerificationReport) -> Self {
        Self {
            passed: report.passed(),
            report,
        }
    }
}

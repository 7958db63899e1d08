use malscan_core::{MalscanError, MethodRef, Severity};

use crate::rule::{guidance, Rule};
use crate::util::{icontains, ieq};

/// Fires on outbound network calls capable of carrying a payload body —
/// `WebClient.UploadData`/`UploadFile`, `HttpClient.PostAsync`,
/// `HttpWebRequest.GetRequestStream` — a coarse call-site signal
/// complementing the data-flow analyzer's `DataExfiltration` pattern.
pub struct DataExfiltrationRule;

impl Rule for DataExfiltrationRule {
    fn id(&self) -> &'static str {
        "DataExfiltrationRule"
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn description(&self) -> String {
        "Sends data to a remote endpoint via an upload-capable network API".into()
    }

    fn developer_guidance(&self) -> Option<malscan_core::DeveloperGuidance> {
        Some(guidance(
            "If the mod needs to report telemetry, document the endpoint and the data sent, \
             and gate it behind explicit user opt-in.",
            None,
            &[],
        ))
    }

    fn is_suspicious(&self, callee: &MethodRef) -> Result<bool, MalscanError> {
        Ok((icontains(&callee.declaring_type, "WebClient")
            && (ieq(&callee.name, "UploadData") || ieq(&callee.name, "UploadFile") || ieq(&callee.name, "UploadString")))
            || (icontains(&callee.declaring_type, "HttpClient")
                && (ieq(&callee.name, "PostAsync") || ieq(&callee.name, "PutAsync")))
            || (icontains(&callee.declaring_type, "HttpWebRequest") && ieq(&callee.name, "GetRequestStream")))
    }
}

/// Fires on remote-fetch APIs capable of pulling an arbitrary payload down
/// — `WebClient.DownloadData`/`DownloadFile`, `HttpClient.GetAsync` —
/// complementing the data-flow analyzer's `DownloadAndExecute` pattern.
pub struct DataInfiltrationRule;

impl Rule for DataInfiltrationRule {
    fn id(&self) -> &'static str {
        "DataInfiltrationRule"
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn description(&self) -> String {
        "Fetches a payload from a remote endpoint via a download-capable network API".into()
    }

    fn is_suspicious(&self, callee: &MethodRef) -> Result<bool, MalscanError> {
        Ok((icontains(&callee.declaring_type, "WebClient")
            && (ieq(&callee.name, "DownloadData") || ieq(&callee.name, "DownloadFile") || ieq(&callee.name, "DownloadString")))
            || (icontains(&callee.declaring_type, "HttpClient") && ieq(&callee.name, "GetAsync"))
            || (icontains(&callee.declaring_type, "WebRequest") && ieq(&callee.name, "Create")))
    }
}

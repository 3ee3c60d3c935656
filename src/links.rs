use url::Url;

use crate::error::{PipelensError, Result};

/// Link to a job's landing page.
///
/// # Arguments
///
/// * `job` - Full job name (e.g., "build" or "Multi/axis=foo")
///
/// # Returns
///
/// Relative link to the job (e.g., `job/build/`)
pub fn job_url(job: &str) -> String {
    format!("job/{job}/")
}

/// Link to a completed build's page.
///
/// # Returns
///
/// Relative link to the build (e.g., `job/build/12/`)
pub fn build_url(job: &str, number: u64) -> String {
    format!("job/{job}/{number}/")
}

/// Link to the live console of a running build (e.g., `job/build/12/console`).
pub fn console_url(job: &str, number: u64) -> String {
    format!("job/{job}/{number}/console")
}

/// Link to a queue item that has not started yet (e.g., `queue/item/7/`).
pub fn queue_item_url(queue_id: u64) -> String {
    format!("queue/item/{queue_id}/")
}

/// Resolves a relative link against the CI server's base URL.
///
/// # Errors
///
/// Returns an error if `base_url` is not a valid URL or the link cannot be joined onto it.
pub fn absolutize(base_url: &str, link: &str) -> Result<String> {
    // Url::join drops the last path segment unless the base ends with a slash
    let base = if base_url.ends_with('/') {
        Url::parse(base_url)
    } else {
        Url::parse(&format!("{base_url}/"))
    }
    .map_err(|e| PipelensError::Config(format!("Invalid base URL: {e}")))?;

    base.join(link)
        .map(String::from)
        .map_err(|e| PipelensError::Config(format!("Invalid link '{link}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_url() {
        assert_eq!(job_url("test"), "job/test/");
    }

    #[test]
    fn test_build_url() {
        assert_eq!(build_url("test", 1), "job/test/1/");
    }

    #[test]
    fn test_console_url() {
        assert_eq!(console_url("test", 1), "job/test/1/console");
    }

    #[test]
    fn test_queue_item_url() {
        assert_eq!(queue_item_url(42), "queue/item/42/");
    }

    #[test]
    fn test_absolutize_with_trailing_slash() {
        let url = absolutize("https://ci.example.com/jenkins/", "job/test/1/").unwrap();
        assert_eq!(url, "https://ci.example.com/jenkins/job/test/1/");
    }

    #[test]
    fn test_absolutize_without_trailing_slash() {
        let url = absolutize("https://ci.example.com/jenkins", "job/test/").unwrap();
        assert_eq!(url, "https://ci.example.com/jenkins/job/test/");
    }

    #[test]
    fn test_absolutize_invalid_base() {
        assert!(absolutize("not a url", "job/test/").is_err());
    }
}

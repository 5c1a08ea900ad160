use chrono_tz::Tz;
use url::Url;

use super::ApiError;

pub fn validate_page(page: u64) -> Result<u64, ApiError> {
    if page == 0 {
        return Err(ApiError::validation(
            "Invalid page: 0. Pages start at 1",
        ));
    }
    Ok(page)
}

pub fn validate_timezone(name: &str) -> Result<Tz, ApiError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ApiError::validation(format!("Unknown timezone: {name}")))
}

pub fn validate_required(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(())
}

/// Accept a post-login redirect only if it stays on this host over http(s).
///
/// Relative targets resolve against `host`. `None` and empty targets mean
/// "no redirect requested".
pub fn validate_redirect(target: Option<&str>, host: &str) -> Result<Option<String>, ApiError> {
    let Some(target) = target.filter(|t| !t.is_empty()) else {
        return Ok(None);
    };

    let base = Url::parse(&format!("http://{host}/"))
        .map_err(|_| ApiError::validation("Invalid Host header"))?;
    let resolved = base
        .join(target)
        .map_err(|_| ApiError::validation("Invalid redirect target"))?;

    let same_origin = matches!(resolved.scheme(), "http" | "https")
        && resolved.host_str() == base.host_str()
        && resolved.port() == base.port();

    if !same_origin {
        return Err(ApiError::validation("Redirect target is not allowed"));
    }

    Ok(Some(target.to_string()))
}

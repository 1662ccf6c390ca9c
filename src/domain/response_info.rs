pub const RESPONSE_INFO_ERROR: &str = "Error retrieving response info";

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseInfo {
    pub code: Option<u16>,
    pub message: String,
}

impl ResponseInfo {
    pub fn from_code(code: u16) -> Self {
        ResponseInfo {
            code: Some(code),
            message: status_message(code).to_string(),
        }
    }

    /// Used when the page could not be asked at all.
    pub fn unknown() -> Self {
        ResponseInfo {
            code: None,
            message: RESPONSE_INFO_ERROR.to_string(),
        }
    }

    /// Prefers the status reported by the navigation timing entry and falls
    /// back to guessing from the page title.
    pub fn resolve(navigation_status: Option<u16>, title: &str) -> Self {
        let code = navigation_status
            .filter(|code| *code != 0)
            .unwrap_or_else(|| code_from_title(title));
        ResponseInfo::from_code(code)
    }
}

pub fn code_from_title(title: &str) -> u16 {
    const TITLE_CODES: [(&str, u16); 6] = [
        ("404", 404),
        ("not found", 404),
        ("403", 403),
        ("forbidden", 403),
        ("500", 500),
        ("server error", 500),
    ];
    let title = title.to_lowercase();

    TITLE_CODES
        .iter()
        .find(|(text, _)| title.contains(text))
        .map(|(_, code)| *code)
        .unwrap_or(200)
}

pub fn status_message(code: u16) -> &'static str {
    match code {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

use url::form_urlencoded;

pub const SEARCH_PATH: &str = "/run_search";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItsMe {
    #[default]
    On,
    Off,
}

impl ItsMe {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItsMe::On => "on",
            ItsMe::Off => "off",
        }
    }
}

impl std::str::FromStr for ItsMe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "on" => Ok(ItsMe::On),
            "off" => Ok(ItsMe::Off),
            other => Err(format!("its-me must be 'on' or 'off', got '{}'", other)),
        }
    }
}

/// Builds `{base_url}/run_search?query=..&its-me=..` followed by the extra
/// pairs in order. Extra keys and values are appended as given.
pub fn build_search_url(
    base_url: &str,
    query: &str,
    its_me: ItsMe,
    extra_params: &[(String, String)],
) -> String {
    let encoded_query: String = form_urlencoded::byte_serialize(query.as_bytes()).collect();
    let mut url = format!(
        "{}{}?query={}&its-me={}",
        base_url.trim_end_matches('/'),
        SEARCH_PATH,
        encoded_query,
        its_me.as_str()
    );

    for (key, value) in extra_params {
        url.push_str(&format!("&{}={}", key, value));
    }

    url
}

//! Page state computation and pagination link generation

use serde::Serialize;
use url::form_urlencoded;

use crate::core::error::ConfigError;

/// The request URL that pagination links are derived from
///
/// Routing parameters are already stripped; only the page parameter is
/// rewritten per link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageUrl {
    pub base_url: String,
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl PageUrl {
    /// Build the URL pointing at `page`
    ///
    /// An existing page parameter keeps its position in the query string,
    /// otherwise it is appended.
    pub fn with_page(&self, page_param: &str, page: u64) -> String {
        let page = page.to_string();
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        let mut replaced = false;

        for (name, value) in &self.query {
            if name == page_param {
                if !replaced {
                    serializer.append_pair(name, &page);
                    replaced = true;
                }
            } else {
                serializer.append_pair(name, value);
            }
        }
        if !replaced {
            serializer.append_pair(page_param, &page);
        }

        format!(
            "{}/{}?{}",
            self.base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/'),
            serializer.finish()
        )
    }
}

/// Computed pagination state for one collection request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginationState {
    per_page: u64,
    total: u64,
    page_param: String,
    current_page: u64,
    last_page: u64,
    count: u64,
    #[serde(skip)]
    url: PageUrl,
}

impl PaginationState {
    /// Compute the page state
    ///
    /// `requested` is the raw page parameter from the request. Non-numeric or
    /// negative values select page 1, values past the last page select the
    /// last page, fractional values are floored.
    pub fn new(
        per_page: u64,
        total: u64,
        page_param: impl Into<String>,
        requested: Option<&str>,
    ) -> Result<Self, ConfigError> {
        if per_page == 0 {
            return Err(ConfigError::invalid(
                "elementsPerPage",
                "0",
                "must be a positive integer",
            ));
        }

        let last_page = total.div_ceil(per_page);
        let current_page = clamp_page(requested, last_page);

        Ok(Self {
            per_page,
            total,
            page_param: page_param.into(),
            current_page,
            last_page,
            count: 0,
            url: PageUrl::default(),
        })
    }

    /// Attach the URL the navigation links are built from
    pub fn with_url(mut self, url: PageUrl) -> Self {
        self.url = url;
        self
    }

    /// Record the number of items actually materialized on this page
    pub fn set_count(&mut self, count: u64) {
        self.count = count;
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn page_param(&self) -> &str {
        &self.page_param
    }

    pub fn current_page(&self) -> u64 {
        self.current_page
    }

    pub fn last_page(&self) -> u64 {
        self.last_page
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Number of items to skip to reach the current page
    pub fn offset(&self) -> u64 {
        (self.current_page - 1) * self.per_page
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.last_page
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    /// URL of the given page
    pub fn url_for(&self, page: u64) -> String {
        self.url.with_page(&self.page_param, page)
    }

    pub fn next_url(&self) -> Option<String> {
        self.has_next().then(|| self.url_for(self.current_page + 1))
    }

    pub fn previous_url(&self) -> Option<String> {
        self.has_previous()
            .then(|| self.url_for(self.current_page - 1))
    }
}

fn clamp_page(requested: Option<&str>, last_page: u64) -> u64 {
    let upper = last_page.max(1);
    let Some(raw) = requested else {
        return 1;
    };

    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 1.0 => {
            let page = value.floor();
            if page >= upper as f64 { upper } else { page as u64 }
        }
        _ => 1,
    }
}

/// Reject a page parameter that collides with a reserved routing parameter
pub fn ensure_page_param(page_param: &str, reserved: &str) -> Result<(), ConfigError> {
    if page_param == reserved {
        return Err(ConfigError::invalid(
            "pageParam",
            page_param,
            format!("conflicts with the reserved path parameter '{}'", reserved),
        ));
    }
    Ok(())
}

/// The two pages of the fleet dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Page {
    /// Single vehicle: dropdown, date range and per-channel charts.
    #[default]
    Detail,
    /// Fleet map: vehicle multi-select, province and date range.
    Map,
}

impl Page {
    /// Resolve a navigation path. Anything but `/map` lands on the detail page.
    pub fn from_path(path: &str) -> Self {
        match path.trim().trim_end_matches('/') {
            "/map" | "map" => Page::Map,
            _ => Page::Detail,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Page::Detail => "/",
            Page::Map => "/map",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Page::Detail => "Vehicle detail",
            Page::Map => "Fleet map",
        }
    }

    pub const ALL: [Page; 2] = [Page::Detail, Page::Map];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_paths() {
        assert_eq!(Page::from_path("/"), Page::Detail);
        assert_eq!(Page::from_path(""), Page::Detail);
        assert_eq!(Page::from_path("/map"), Page::Map);
        assert_eq!(Page::from_path("/map/"), Page::Map);
        assert_eq!(Page::from_path("/elsewhere"), Page::Detail);
    }

    #[test]
    fn path_round_trips() {
        for page in Page::ALL {
            assert_eq!(Page::from_path(page.path()), page);
        }
    }
}

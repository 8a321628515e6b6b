macro_rules! v1_path {
    ($path:literal) => {
        concat!("/api/v1", $path)
    };
}

/// Unversioned liveness probe.
pub const HEALTH: &str = "/health";

/// Versioned API route definitions shared by the server and federation peers
pub mod v1 {
    pub const ROOT: &str = "/api/v1";
    pub const VERSION: &str = "v1";

    pub mod crisis {
        pub const STATUS: &str = v1_path!("/communities/{id}/crisis/status");
        pub const TOGGLE: &str = v1_path!("/communities/{id}/crisis/toggle");
        pub const VOTE: &str = v1_path!("/communities/{id}/crisis/vote");
    }

    pub mod tickets {
        pub const COLLECTION: &str = v1_path!("/communities/{id}/tickets");
        pub const TRIAGE: &str = v1_path!("/communities/{id}/tickets/triage");
        pub const ITEM: &str = v1_path!("/communities/{id}/tickets/{ticket_id}");
        pub const COMMENTS: &str = v1_path!("/communities/{id}/tickets/{ticket_id}/comments");
    }

    pub mod directory {
        pub const COLLECTION: &str = v1_path!("/directory");
        pub const ITEM: &str = v1_path!("/directory/{id}");
        pub const REFRESH: &str = v1_path!("/directory/refresh");
    }

    pub mod alerts {
        pub const COLLECTION: &str = v1_path!("/alerts");
        pub const SEND: &str = v1_path!("/alerts/send");
        pub const RECEIVE: &str = v1_path!("/alerts/receive");
        pub const DISMISS: &str = v1_path!("/alerts/{id}/dismiss");
    }

    pub mod instance {
        pub const INFO: &str = v1_path!("/instance/info");
    }
}

/// Fill the `{id}` segment of a route template.
pub fn with_id(template: &str, id: impl std::fmt::Display) -> String {
    template.replacen("{id}", &id.to_string(), 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_share_the_versioned_prefix() {
        assert_eq!(v1::instance::INFO, "/api/v1/instance/info");
        assert!(v1::tickets::COMMENTS.starts_with(v1::ROOT));
        assert_eq!(
            with_id(v1::crisis::VOTE, "abc"),
            "/api/v1/communities/abc/crisis/vote"
        );
    }
}

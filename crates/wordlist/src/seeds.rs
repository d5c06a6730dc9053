//! Built-in seed material.
//!
//! The standard-service seed guarantees useful coverage with no wordlist at
//! all, and the common-word list feeds pattern expansion when brute-force
//! discovery is in play.

/// Fixed fully-qualified services probed on every scan, with the methods
/// worth trying on each.
pub const STANDARD_SERVICES: &[(&str, &[&str])] = &[
    ("grpc.health.v1.Health", &["Check", "Watch", "List"]),
    ("grpc.reflection.v1alpha.ServerReflection", &["ServerReflectionInfo"]),
    ("grpc.reflection.v1.ServerReflection", &["ServerReflectionInfo"]),
    ("helloworld.Greeter", &["SayHello", "StreamHello"]),
    ("ping.PingService", &["Ping", "Echo", "Check"]),
    ("echo.EchoService", &["Echo", "Send"]),
];

/// Bare words expanded into candidate service names during brute-force
/// discovery. Deliberately short: each word multiplies through the pattern
/// expander.
pub const COMMON_WORDS: &[&str] = &[
    "user", "auth", "account", "admin", "api", "cart", "config", "data", "debug", "echo",
    "file", "health", "hello", "internal", "inventory", "message", "notification", "order",
    "payment", "ping", "product", "search", "session", "status", "storage", "test", "token",
];

/// Default methods substituted when an entry has no explicit method list.
pub const DEFAULT_METHODS: &[&str] = &[
    "Get", "List", "Create", "Update", "Delete", "Find", "Search", "Query", "Check", "Ping",
];

/// Methods tried first when a per-candidate method cap is in force.
pub const HIGH_PRIORITY_METHODS: &[&str] = &[
    "Get", "List", "Create", "Update", "Delete", "GetById", "GetByName", "Search", "Count",
    "Ping", "Check", "Status", "Health", "Version", "Login", "Logout", "Authorize", "Validate",
    "GetConfig", "SetConfig", "GetSettings",
];

/// Domain-specific method vocabulary for bare names. The mapping is small
/// and fixed; `file` and `storage` share a set.
#[must_use]
pub fn domain_methods(bare_name: &str) -> &'static [&'static str] {
    let lower = bare_name.to_lowercase();
    let base = lower.strip_suffix("service").unwrap_or(&lower);
    match base {
        "user" => &["Login", "Logout", "Register", "VerifyEmail", "ResetPassword"],
        "auth" => &["Login", "Logout", "Verify", "Refresh", "ValidateToken"],
        "file" | "storage" => &["Upload", "Download", "List", "GetInfo"],
        "payment" => &["Process", "Refund", "GetStatus", "CalculateTotal"],
        "ping" => &["Ping", "Echo", "Status", "IsAlive"],
        "hello" => &["SayHello", "Hello", "Greet", "StreamHello"],
        "product" => &[
            "GetProduct",
            "ListProducts",
            "CreateProduct",
            "UpdateProduct",
            "DeleteProduct",
            "SearchProducts",
        ],
        "order" => &["GetOrder", "ListOrders", "CreateOrder", "UpdateOrder", "CancelOrder"],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_covers_health_and_both_reflection_services() {
        let names: Vec<&str> = STANDARD_SERVICES.iter().map(|(s, _)| *s).collect();
        assert!(names.contains(&"grpc.health.v1.Health"));
        assert!(names.contains(&"grpc.reflection.v1alpha.ServerReflection"));
        assert!(names.contains(&"grpc.reflection.v1.ServerReflection"));
        assert!(names.contains(&"helloworld.Greeter"));
    }

    #[test]
    fn seed_entries_always_have_methods() {
        for (service, methods) in STANDARD_SERVICES {
            assert!(!methods.is_empty(), "{service} has no methods");
        }
    }

    #[test]
    fn domain_vocabulary_lookup() {
        assert!(domain_methods("auth").contains(&"ValidateToken"));
        assert!(domain_methods("Auth").contains(&"Refresh"));
        assert!(domain_methods("UserService").contains(&"Login"));
        assert!(domain_methods("storage").contains(&"Upload"));
        assert!(domain_methods("unrelated").is_empty());
    }

    #[test]
    fn default_methods_start_with_get() {
        assert_eq!(DEFAULT_METHODS[0], "Get");
        assert_eq!(DEFAULT_METHODS.len(), 10);
    }
}

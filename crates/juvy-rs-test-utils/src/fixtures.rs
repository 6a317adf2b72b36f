//! Schema descriptions reused by tests.

use serde_json::{Value, json};

/// Minimal server schema: an environment enum and a port.
pub fn server_schema() -> Value {
    json!({
        "env": {
            "doc": "The application environment.",
            "format": ["production", "development", "test"],
            "default": "development",
            "env": "NODE_ENV",
            "arg": "env",
        },
        "port": {
            "doc": "The port to bind.",
            "format": "port",
            "default": 3000,
            "env": "PORT",
            "arg": "port",
        },
    })
}

/// Broader schema touching every format kind, a sensitive leaf and an
/// object-valued leaf.
pub fn app_schema() -> Value {
    json!({
        "env": {
            "format": ["production", "development", "test"],
            "default": "development",
            "env": "NODE_ENV",
        },
        "server": {
            "host": { "default": "127.0.0.1", "env": "HOST", "arg": "host" },
            "port": { "format": "port", "default": 3000, "env": "PORT", "arg": "port" },
            "workers": { "format": "nat", "default": 4, "env": "WORKERS" },
        },
        "db": {
            "url": { "default": "postgres://localhost/app", "env": "DATABASE_URL" },
            "password": {
                "format": "String",
                "default": "changeme",
                "sensitive": true,
                "env": "DB_PASSWORD",
            },
            "pool": {
                "min": { "format": "integer", "default": 1 },
                "max": { "format": "integer", "default": 10 },
            },
            "options": { "format": "object", "default": { "ssl": false } },
        },
        "features": { "format": "array", "default": ["login"], "env": "FEATURES" },
        "ratio": { "format": "number", "default": 0.5, "arg": "ratio" },
        "debug": { "format": "boolean", "default": false, "env": "DEBUG", "arg": "debug" },
        "pattern": { "format": "regexp", "default": "^api/", "env": "ROUTE_PATTERN" },
        "token": { "format": "String", "default": null, "nullable": true, "sensitive": true },
    })
}

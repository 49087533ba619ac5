//! Structure Validation Tests
//!
//! Whole-document validation against declared structures:
//! - Documents filled with matching values validate
//! - Undeclared fields and missing required fields are rejected
//! - List positions, positional update keys and subdocuments are addressed
//!   by dotted path
//! - OR / IS composites, type-keyed entries and embedded schemas
//! - Validation is deterministic and never mutates its input

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use docguard::schema::{
    Descriptor, KeyType, Schema, SchemaBuilder, SchemaDocument, SchemaErrorCode, Structure,
};
use docguard::validation::validate_structure;
use docguard::value::{Document, Value};
use serde_json::json;
use uuid::Uuid;

// =============================================================================
// Helper Functions
// =============================================================================

fn doc(json: serde_json::Value) -> Document {
    match Value::from(json) {
        Value::Document(doc) => doc,
        other => panic!("expected document, got {}", other),
    }
}

fn comment() -> Arc<Schema> {
    SchemaBuilder::new("Comment")
        .field("author", Descriptor::string())
        .field("text", Descriptor::string())
        .field("rank", Descriptor::integer())
        .required("text")
        .build()
        .unwrap()
}

fn blog_post() -> Arc<Schema> {
    SchemaBuilder::new("BlogPost")
        .field("author", Descriptor::string())
        .field("title", Descriptor::string())
        .field("views", Descriptor::integer())
        .field("total", Descriptor::long())
        .field("rating", Descriptor::float())
        .field("published", Descriptor::boolean())
        .field("created", Descriptor::datetime())
        .field("token", Descriptor::identifier())
        .field("thumbnail", Descriptor::binary())
        .field("extra", Descriptor::document())
        .field("tags", Descriptor::list_of(Descriptor::string()))
        .field("comments", Descriptor::list_of(&comment()))
        .field(
            "status",
            Descriptor::one_of_values([Value::from("draft"), Value::from("live")]),
        )
        .field(
            "slug",
            Descriptor::any_of([Descriptor::string(), Descriptor::null()]),
        )
        .field(
            "meta",
            Structure::new()
                .field("lang", Descriptor::string())
                .typed_field(KeyType::matching("^x_").unwrap(), Descriptor::string()),
        )
        .required_fields(["author", "title"])
        .build()
        .unwrap()
}

fn full_post() -> Document {
    let mut body = doc(json!({
        "author": "alice",
        "title": "Scaling document stores",
        "views": 3,
        "total": {"$long": "9000000000"},
        "rating": 4.5,
        "published": true,
        "created": {"$date": "2024-02-01T10:00:00Z"},
        "thumbnail": {"$binary": "aGVsbG8="},
        "extra": {"anything": [1, "two"]},
        "tags": ["rust", "db"],
        "comments": [{"author": "bob", "text": "nice", "rank": 1}],
        "status": "live",
        "slug": null,
        "meta": {"lang": "en", "x_source": "import"}
    }));
    body.insert("token".into(), Value::Identifier(Uuid::new_v4()));
    body
}

// =============================================================================
// Round-Trip Validity Tests
// =============================================================================

/// Every field filled with a matching value validates.
#[test]
fn test_fully_populated_document_validates() {
    let schema = blog_post();
    assert!(schema.validate(&full_post()).is_ok());
}

/// Native chrono values match datetime fields like `$date` markers do.
#[test]
fn test_native_datetime_value() {
    let schema = blog_post();
    let mut body = full_post();
    body.insert(
        "created".into(),
        Value::DateTime(Utc.with_ymd_and_hms(2020, 5, 1, 0, 0, 0).unwrap()),
    );
    assert!(schema.validate(&body).is_ok());
}

/// Only required fields present is enough.
#[test]
fn test_minimal_document_validates() {
    let schema = blog_post();
    assert!(schema
        .validate(&doc(json!({"author": "a", "title": "t"})))
        .is_ok());
}

// =============================================================================
// Unknown Field Tests
// =============================================================================

/// Exactly the undeclared keys are named.
#[test]
fn test_unknown_fields_named() {
    let schema = blog_post();
    let mut body = full_post();
    body.insert("likes".into(), Value::Int(1));
    body.insert("category".into(), Value::from("x"));

    let err = schema.validate(&body).unwrap_err();
    assert_eq!(err.code(), SchemaErrorCode::DgValidationFailed);
    assert_eq!(
        err.message(),
        "Encountered field(s) not present in structure: 'category', 'likes'"
    );
}

/// Undeclared keys inside a subdocument name the subdocument path.
#[test]
fn test_unknown_nested_field() {
    let schema = blog_post();
    let body = doc(json!({"author": "a", "title": "t", "meta": {"lang": "en", "size": 3}}));
    let err = schema.validate(&body).unwrap_err();
    assert_eq!(
        err.message(),
        "Encountered field(s), in subdocument at meta, not present in structure: 'size'"
    );
}

/// Keys matched by a type-keyed entry are declared.
#[test]
fn test_typed_key_accepts_matching_names() {
    let schema = blog_post();
    let body = doc(json!({"author": "a", "title": "t", "meta": {"x_a": "1", "x_b": "2"}}));
    assert!(schema.validate(&body).is_ok());

    let body = doc(json!({"author": "a", "title": "t", "meta": {"x_a": 1}}));
    let err = schema.validate(&body).unwrap_err();
    assert_eq!(
        err.message(),
        "Position 'meta.x_a' was declared to be string, but encountered value 1"
    );
}

// =============================================================================
// Required Field Tests
// =============================================================================

/// Only the absent required fields are named.
#[test]
fn test_required_fields() {
    let schema = SchemaBuilder::new("Pair")
        .field("a", Descriptor::integer())
        .field("b", Descriptor::integer())
        .field("c", Descriptor::integer())
        .required_fields(["a", "b"])
        .build()
        .unwrap();

    let err = schema.validate(&doc(json!({"b": 1, "c": 2}))).unwrap_err();
    assert_eq!(err.message(), "Missing required field(s) 'a'");
    assert!(schema.validate(&doc(json!({"a": 1, "b": 2}))).is_ok());
}

// =============================================================================
// List Tests
// =============================================================================

/// List members are checked at their position.
#[test]
fn test_list_of_scalars() {
    let structure = Structure::new().field("field", Descriptor::list_of(Descriptor::string()));
    assert!(validate_structure(&doc(json!({"field": ["x", "y"]})), &structure).is_ok());

    let err = validate_structure(&doc(json!({"field": [1]})), &structure).unwrap_err();
    assert_eq!(err.path(), Some("field.0"));
    assert_eq!(
        err.message(),
        "Position 'field.0' was declared to be string, but encountered value 1"
    );
}

/// Subdocuments in lists are walked with their own paths.
#[test]
fn test_list_of_embedded_documents() {
    let schema = blog_post();
    let body = doc(json!({
        "author": "a",
        "title": "t",
        "comments": [{"text": "ok"}, {"text": "bad", "rank": "high"}]
    }));
    let err = schema.validate(&body).unwrap_err();
    assert_eq!(
        err.message(),
        "Position 'comments.1.rank' was declared to be integer, but encountered value 'high'"
    );
}

/// Embedded required fields are checked at the embedded path.
#[test]
fn test_embedded_required_field() {
    let schema = blog_post();
    let body = doc(json!({"author": "a", "title": "t", "comments": [{"rank": 1}]}));
    let err = schema.validate(&body).unwrap_err();
    assert_eq!(
        err.message(),
        "Missing required field(s) 'text' in subdocument at comments.0"
    );
}

/// Positional keys stand in for list indexes in expanded update bodies.
#[test]
fn test_positional_keys() {
    let structure = Structure::new().field("field", Descriptor::list_of(Descriptor::integer()));
    assert!(validate_structure(&doc(json!({"field": {"0": 5, "$": 6}})), &structure).is_ok());
    assert!(validate_structure(&doc(json!({"field": {"bogus": 5}})), &structure).is_err());
}

// =============================================================================
// Composite Descriptor Tests
// =============================================================================

/// IS accepts only the listed values.
#[test]
fn test_is_descriptor() {
    let schema = blog_post();
    let err = schema
        .validate(&doc(json!({"author": "a", "title": "t", "status": "deleted"})))
        .unwrap_err();
    assert_eq!(
        err.message(),
        "Position 'status' was declared to be <IS 'draft', 'live'>, but encountered value 'deleted'"
    );
}

/// OR accepts any member type.
#[test]
fn test_or_descriptor() {
    let schema = blog_post();
    assert!(schema
        .validate(&doc(json!({"author": "a", "title": "t", "slug": "x"})))
        .is_ok());
    let err = schema
        .validate(&doc(json!({"author": "a", "title": "t", "slug": 5})))
        .unwrap_err();
    assert_eq!(
        err.message(),
        "Position 'slug' was declared to be <OR null, string>, but encountered value 5"
    );
}

/// Numeric tags do not coerce into each other.
#[test]
fn test_numeric_types_are_exact() {
    let schema = blog_post();
    let err = schema
        .validate(&doc(json!({"author": "a", "title": "t", "rating": 4})))
        .unwrap_err();
    assert_eq!(
        err.message(),
        "Position 'rating' was declared to be float, but encountered value 4"
    );
}

// =============================================================================
// Determinism Tests
// =============================================================================

/// Repeated validation gives the same outcome and leaves the body alone.
#[test]
fn test_validation_is_idempotent() {
    let schema = blog_post();
    let valid = SchemaDocument::new(&schema, full_post());
    let before = valid.body().clone();
    for _ in 0..10 {
        assert!(valid.validate().is_ok());
    }
    assert_eq!(valid.body(), &before);

    let invalid = SchemaDocument::new(&schema, doc(json!({"author": 1})));
    let first = invalid.validate().unwrap_err();
    for _ in 0..10 {
        assert_eq!(invalid.validate().unwrap_err(), first);
    }
}

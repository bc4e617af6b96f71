//! Request binding demonstration.
//!
//! This example shows how a handler binds an HTTP request into a typed record:
//! 1. Declare the record's fields and tags
//! 2. Bind the request
//! 3. Use the populated record, or render the failure for the client
//!
//! Run with: `cargo run --example bind_request`

use hx_bind::{BindConfig, BindError, Binder, FieldVisitor, Record};

#[derive(Debug, Default)]
struct Page {
    num: i64,
    size: i64,
}

impl Record for Page {
    fn visit_fields<V: FieldVisitor>(&mut self, v: &mut V) -> Result<(), BindError> {
        v.field("PageNum", r#"hx_default:"1""#, &mut self.num)?;
        v.field("PageSize", r#"hx_default:"20" hx_range:"1-100""#, &mut self.size)
    }
}

#[derive(Debug, Default)]
struct Quality {
    level: f64,
}

impl Record for Quality {
    fn visit_fields<V: FieldVisitor>(&mut self, v: &mut V) -> Result<(), BindError> {
        v.field("Level", r#"hx_must:"true" hx_range:"0-10""#, &mut self.level)
    }
}

#[derive(Debug, Default)]
struct UpdateInput {
    page: Page,
    client_ip: String,
    bandwidth: u64,
    mode: String,
    tags: Vec<String>,
    quality: Option<Quality>,
}

impl Record for UpdateInput {
    fn visit_fields<V: FieldVisitor>(&mut self, v: &mut V) -> Result<(), BindError> {
        v.embedded("Page", &mut self.page)?;
        v.field(
            "ClientIp",
            r#"hx_place:"header" hx_name:"X-Real-Ip" hx_must:"true""#,
            &mut self.client_ip,
        )?;
        v.field(
            "Bandwidth",
            r#"hx_tag:"query;bandwidth;true;;1-10""#,
            &mut self.bandwidth,
        )?;
        v.field("Mode", r#"hx_default:"fast" hx_range:"fast,slow""#, &mut self.mode)?;
        v.field("Tags", "", &mut self.tags)?;
        v.nested_optional("Quality", "", &mut self.quality)
    }
}

/// Simulates a handler receiving a request
fn handle_update(binder: &Binder, request: http::Request<Vec<u8>>) {
    println!("\n=== {} {} ===", request.method(), request.uri());

    let mut input = UpdateInput::default();
    match binder.bind(&request, &mut input) {
        Ok(()) => {
            println!("   Bound: {input:#?}");
        }
        Err(err) => {
            let rejection = binder.reject(&err);
            println!("   Rejected with status {}", rejection.status());
            println!("   Body: {}", rejection.to_json());
        }
    }
}

fn request(uri: &str, ip: Option<&str>, body: &str) -> http::Request<Vec<u8>> {
    let mut builder = http::Request::builder().method("PATCH").uri(uri);
    if let Some(ip) = ip {
        builder = builder.header("x-real-ip", ip);
    }
    match builder.body(body.as_bytes().to_vec()) {
        Ok(request) => request,
        Err(err) => panic!("invalid demo request: {err}"),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    println!("Request Binding Demo");
    println!("====================");

    let binder = Binder::new(BindConfig::default());

    // Successful bind: every source contributes
    handle_update(
        &binder,
        request(
            "/streams?bandwidth=4&PageSize=50",
            Some("172.1.2.1"),
            r#"{"Tags":["hd","live"], "Quality":{"Level":7.5}}"#,
        ),
    );

    // Missing header
    handle_update(&binder, request("/streams?bandwidth=4", None, ""));

    // Out of range
    handle_update(
        &binder,
        request("/streams?bandwidth=40", Some("172.1.2.1"), ""),
    );

    // Wrong JSON type
    handle_update(
        &binder,
        request(
            "/streams?bandwidth=4",
            Some("172.1.2.1"),
            r#"{"Quality":{"Level":"high"}}"#,
        ),
    );

    // Malformed body wins over everything else
    handle_update(&binder, request("/streams", None, "{"));

    println!("\n=== Demo Complete ===");
}

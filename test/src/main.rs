use ember_http::{
    external::dotenv::dotenv, ClientContext, CompressionMode, DeflateMode, Field, FormData,
    HttpRequest, MessageDeflater, MessageInflater, SendableError, SessionStore, StorageMode,
};
use http::Method;
use serde_json::json;

fn main() {
    dotenv().ok();

    if let Err(e) = run() {
        println!("an error occured; error = {:?}", e);
    }
}

fn run() -> Result<(), SendableError> {
    let client = ClientContext::new("127.0.0.1:9000".parse()?, CompressionMode::Gzip);

    // First request: no cookie yet, the handler opens a session.
    let mut request = HttpRequest::new(
        Method::GET,
        "/login",
        "user=alice&redirect=%2Fhome",
        "",
        "http://localhost:9000",
        "",
        &client,
        "",
        None,
    );
    println!(
        "parameters: user={:?} redirect={:?}",
        request.parameter("user"),
        request.parameter("redirect"),
    );

    request.set_session_attribute("user", json!("alice"));
    let sid = request.session_id().to_owned();
    println!("session created: {}", &sid);

    // Second request on the same connection carries the SID cookie back.
    let request = HttpRequest::new(
        Method::POST,
        "/profile",
        "",
        &format!("SID={}; theme=dark", sid),
        "http://localhost:9000",
        "",
        &client,
        r#"{"bio": "hello"}"#,
        Some(upload_form()?),
    );
    println!(
        "session bound: {}, user attribute: {:?}",
        request.is_session_valid(),
        SessionStore::get_attribute(request.session_id(), "user"),
    );
    println!("json payload: {}", request.json_value()?);

    if let Some(form) = request.multipart() {
        for name in form.field_names() {
            println!("multipart field: {}", name);
        }
    }

    // Response body compression the way the connection negotiated it.
    let body = b"<html><body>hello</body></html>".repeat(100);
    let compressed = ember_http::gzip(&body, false)?;
    let restored = ember_http::gunzip(&compressed, false)?;
    println!(
        "gzip: {} -> {} bytes, round trip ok: {}",
        body.len(),
        compressed.len(),
        restored == body,
    );

    // WebSocket messages on one connection, sharing compression context.
    let mut deflater = MessageDeflater::new(DeflateMode::Raw, true);
    let mut inflater = MessageInflater::new(DeflateMode::Raw, true);
    for text in ["first message", "first message, then a second one"] {
        let payload = deflater.compress_message(text.as_bytes())?;
        let restored = inflater.decompress_message(&payload)?;
        println!(
            "ws message: {} -> {} bytes, round trip ok: {}",
            text.len(),
            payload.len(),
            restored == text.as_bytes(),
        );
    }

    SessionStore::remove(&sid);
    Ok(())
}

fn upload_form() -> Result<FormData, SendableError> {
    let mut form = FormData::new();

    let mut comment = Field::with_storage(StorageMode::Memory);
    comment.set_text_kind()?;
    comment.accept(b"a comment typed into the form")?;
    form.insert("comment", comment);

    let mut avatar = Field::with_storage(StorageMode::Memory);
    avatar.set_file_kind()?;
    avatar.set_file_name("avatar.png");
    avatar.accept(&[0x89, b'P', b'N', b'G'])?;
    println!(
        "avatar: {} bytes, content type {}",
        avatar.file_size()?,
        avatar.content_type()?,
    );
    form.insert("avatar", avatar);

    Ok(form)
}

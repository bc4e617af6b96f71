//! Extraction boundary between framework request types and the bind engine.

use super::RequestContext;
use crate::error::BindError;

/// Builds a [`RequestContext`] from a framework-specific request.
///
/// The body is decoded first, so a malformed body is reported before anything
/// else is looked at.
///
/// This crate implements the trait for `http::Request<B>` with any buffered
/// body. Other frameworks can implement it for their own request types.
///
/// # Examples
///
/// ```
/// use hx_bind::web::{ExtractContext, RequestContext};
/// use hx_bind::BindError;
///
/// struct MyFrameworkRequest {
///     params: Vec<(String, String)>,
///     body: Vec<u8>,
/// }
///
/// impl ExtractContext for MyFrameworkRequest {
///     fn extract_context(&self) -> Result<RequestContext, BindError> {
///         let mut context = RequestContext::new();
///         context.decode_body(&self.body)?;
///         for (k, v) in &self.params {
///             context.add_query_param(k.clone(), v.clone());
///         }
///         Ok(context)
///     }
/// }
///
/// let req = MyFrameworkRequest {
///     params: vec![("page".to_string(), "2".to_string())],
///     body: Vec::new(),
/// };
/// let context = req.extract_context().unwrap();
/// assert_eq!(context.query("page"), Some("2"));
/// ```
pub trait ExtractContext {
    /// Extracts the query, header and body inputs of the request.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::MalformedBody`] if the body is not valid JSON.
    fn extract_context(&self) -> Result<RequestContext, BindError>;
}

impl<B: AsRef<[u8]>> ExtractContext for http::Request<B> {
    fn extract_context(&self) -> Result<RequestContext, BindError> {
        let mut context = RequestContext::new();
        context.decode_body(self.body().as_ref())?;

        if let Some(query) = self.uri().query() {
            context.parse_query(query);
        }

        for (name, value) in self.headers() {
            context.add_header(
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }

        Ok(context)
    }
}

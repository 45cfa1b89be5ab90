//! Small declarative helpers shared by the HTTP apps.

#[cfg(feature = "actix")]
#[doc(hidden)]
pub use actix_web as __actix_web;

/// Generates a `pub fn routes(cfg: &mut ServiceConfig)` registering every listed service.
///
/// Each entry is any `HttpServiceFactory` expression: a handler annotated with
/// `#[get]`/`#[post]`, or a `web::resource(..)` built inline.
///
/// ```rust,ignore
/// macros_utils::routes! {
///     route health_route,
///     route web::resource("/ping").route(web::route().to(ping)),
/// }
/// ```
#[cfg(feature = "actix")]
#[macro_export]
macro_rules! routes {
    ($(route $route:expr),* $(,)?) => {
        pub fn routes(cfg: &mut $crate::__actix_web::web::ServiceConfig) {
            $(cfg.service($route);)*
        }
    };
}

//! Convenience macros for plugin development.

/// Builds a [`HookPayload`](crate::HookPayload) from key/value pairs.
///
/// # Example
/// ```rust,ignore
/// let payload = hook_payload!({
///     "email" => json!("eve@example.com"),
///     "domain" => json!("example.com"),
/// });
/// let payload = hook_payload!(actor: user_id, { "volume" => json!("scratch") });
/// ```
#[macro_export]
macro_rules! hook_payload {
    () => {
        $crate::prelude::HookPayload::new()
    };
    ({ $($key:expr => $value:expr),* $(,)? }) => {{
        let mut payload = $crate::prelude::HookPayload::new();
        $(
            payload.data.insert($key.to_string(), $value);
        )*
        payload
    }};
    (actor: $actor:expr, { $($key:expr => $value:expr),* $(,)? }) => {{
        let mut payload = $crate::prelude::HookPayload::new().with_actor($actor);
        $(
            payload.data.insert($key.to_string(), $value);
        )*
        payload
    }};
}

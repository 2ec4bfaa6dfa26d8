//! # Component System
//!
//! Components are plain data records with no behavior. Any `'static` type
//! can be one; the trait only carries the naming contract the inspector
//! relies on.

/// Trait for ECS components.
///
/// The default methods describe a component with no inspectable fields.
/// Types that want to show up with field values in an inspector dump
/// override [`Component::field_names`] and [`Component::field_values`],
/// usually through [`impl_component!`](crate::impl_component).
///
/// # Example
///
/// ```rust
/// use strata_core::{impl_component, Component};
///
/// struct Health {
///     current: i32,
///     max: i32,
/// }
///
/// impl_component!(Health { current, max });
///
/// let health = Health { current: 7, max: 10 };
/// assert_eq!(Health::field_names(), &["current", "max"]);
/// assert_eq!(health.field_values(), vec!["7".to_string(), "10".to_string()]);
/// ```
pub trait Component: 'static {
    /// Human-readable name of the component type.
    ///
    /// Defaults to the last path segment of [`std::any::type_name`].
    fn type_name() -> &'static str
    where
        Self: Sized,
    {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Ordered field names, matching [`Component::field_values`].
    fn field_names() -> &'static [&'static str]
    where
        Self: Sized,
    {
        &[]
    }

    /// Ordered, stringified field values.
    fn field_values(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Strips the module path from a type name, keeping generic arguments
/// intact (`a::b::Foo<c::Bar>` becomes `Foo<c::Bar>`).
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

/// Implements [`Component`] for a struct, listing the fields the inspector
/// should report. Every listed field must implement `Display`.
///
/// `impl_component!(Marker)` implements the trait with no fields.
#[macro_export]
macro_rules! impl_component {
    ($ty:ident) => {
        impl $crate::Component for $ty {}
    };
    ($ty:ident { $($field:ident),* $(,)? }) => {
        impl $crate::Component for $ty {
            fn field_names() -> &'static [&'static str] {
                &[$(stringify!($field)),*]
            }

            fn field_values(&self) -> ::std::vec::Vec<::std::string::String> {
                ::std::vec![$(::std::string::ToString::to_string(&self.$field)),*]
            }
        }
    };
}

//! Macros for declaring states.

/// Declare unit structs that implement `State` with every default.
///
/// Each struct's `name()` is its identifier. Useful for states that only
/// mark a mode of operation and never veto anything.
///
/// # Example
///
/// ```
/// use lockstep::core::State;
/// use lockstep::unit_state;
///
/// unit_state! {
///     pub struct Idle;
///     pub struct Stopped;
/// }
///
/// assert_eq!(Idle.name(), "Idle");
/// assert!(Stopped.enter_allowed(&Idle));
/// ```
#[macro_export]
macro_rules! unit_state {
    (
        $(
            $(#[$meta:meta])*
            $vis:vis struct $name:ident;
        )+
    ) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
            $vis struct $name;

            impl $crate::core::State for $name {
                fn name(&self) -> &str {
                    stringify!($name)
                }
            }
        )+
    };
}

//! Declares a function-pointer service table plus its registration and
//! accessor plumbing.
//!
//! Kernel crates are split along compile-time boundaries (`core` doesn't
//! know about `drivers`, `drivers` doesn't know about `boot`), but code in
//! one crate still needs to call into another at runtime. `define_service!`
//! generates the vtable that lets the consuming crate declare what it
//! needs, while the providing crate registers an implementation once
//! during boot:
//!
//! ```ignore
//! slopos_lib::define_service! {
//!     widget => WidgetServices {
//!         spin(speed: u32) -> i32;
//!     }
//! }
//! ```
//!
//! expands to a `WidgetServices` struct of fn pointers, a
//! `register_widget_services(&'static WidgetServices)` used by the
//! implementing crate, a `widget_services() -> &'static WidgetServices`
//! accessor, and (unless the method is tagged `@no_wrapper`) a free
//! function `spin(speed: u32) -> i32` that forwards through the table.
//!
//! `@no_wrapper` methods skip the free function; the caller writes its own
//! wrapper, usually because the real signature isn't FFI-safe (slices,
//! `!` return types) and needs manual translation at the call site.
#[macro_export]
macro_rules! define_service {
    (
        $(#[$sattr:meta])*
        $name:ident => $Struct:ident {
            $($body:tt)*
        }
    ) => {
        $crate::define_service!(@struct $(#[$sattr])* $name => $Struct { } { $($body)* });
        $crate::define_service!(@wrappers $name { $($body)* });
    };

    (@struct $(#[$sattr:meta])* $name:ident => $Struct:ident { $($acc:tt)* } {
        $(@$tag:ident)? $method:ident ( $($argname:ident : $argty:ty),* $(,)? ) $(-> $ret:ty)? ; $($rest:tt)*
    }) => {
        $crate::define_service!(@struct $(#[$sattr])* $name => $Struct {
            $($acc)*
            pub $method: fn($($argty),*) $(-> $ret)?,
        } { $($rest)* });
    };
    (@struct $(#[$sattr:meta])* $name:ident => $Struct:ident { $($acc:tt)* } {}) => {
        $(#[$sattr])*
        #[derive(Clone, Copy)]
        pub struct $Struct {
            $($acc)*
        }

        $crate::paste::paste! {
            static [<$name:upper _SERVICE>]: $crate::ServiceCell<$Struct> = $crate::ServiceCell::new();

            /// Register the backing implementation. Call once during boot.
            pub fn [<register_ $name _services>](services: &'static $Struct) {
                [<$name:upper _SERVICE>].register(services);
            }

            #[inline(always)]
            pub fn [<$name _services>]() -> &'static $Struct {
                [<$name:upper _SERVICE>].get()
            }

            #[inline(always)]
            pub fn [<$name _services_ready>]() -> bool {
                [<$name:upper _SERVICE>].is_registered()
            }
        }
    };

    (@wrappers $name:ident { @no_wrapper $method:ident ( $($argname:ident : $argty:ty),* $(,)? ) $(-> $ret:ty)? ; $($rest:tt)* }) => {
        $crate::define_service!(@wrappers $name { $($rest)* });
    };
    (@wrappers $name:ident { $method:ident ( $($argname:ident : $argty:ty),* $(,)? ) $(-> $ret:ty)? ; $($rest:tt)* }) => {
        $crate::paste::paste! {
            #[inline(always)]
            pub fn $method($($argname: $argty),*) $(-> $ret)? {
                ([<$name _services>]().$method)($($argname),*)
            }
        }
        $crate::define_service!(@wrappers $name { $($rest)* });
    };
    (@wrappers $name:ident {}) => {};
}

/// Generates a Rust enum for an open BACnet enumeration: named variants for
/// the standard values, a `Custom` variant for values inside the
/// vendor/proprietary range, and a `Reserved` variant for everything else.
///
/// BACnet enumerations are open sets. Wire values that are not named must
/// still round-trip unmodified, so the generated `From` conversions are
/// total in both directions.
///
/// # Arguments
///
/// * `$name:ident` - The name of the enum to be generated.
/// * `$variant:ident = $value:expr` - A comma-separated list of named enum
///   variants and their corresponding integer values.
/// * `$unit:ident` - The underlying integer type (e.g., `u8`, `u16`, `u32`).
/// * `$range:expr` - The proprietary range (e.g., `128..=1023`). Unnamed
///   values inside it become `Custom`, unnamed values outside it `Reserved`.
///
/// # Example
///
/// ```rust
/// use bacnet_core::generate_custom_enum;
///
/// generate_custom_enum! {
///     MyEnum {
///         VariantA = 1,
///         VariantB = 2,
///         VariantC = 100,
///     },
///     u16,
///     1000..=2000
/// }
///
/// let custom_val = MyEnum::from(1500u16);
/// let reserved_val = MyEnum::from(3000u16);
/// assert_eq!(MyEnum::from(100u16), MyEnum::VariantC);
/// assert_eq!(u16::from(MyEnum::VariantA), 1);
/// if let MyEnum::Custom(value) = custom_val {
///     assert_eq!(value.value(), 1500);
/// } else {
///     panic!("Expected MyEnum::Custom");
/// }
/// if let MyEnum::Reserved(value) = reserved_val {
///     assert_eq!(value.value(), 3000);
/// } else {
///     panic!("Expected MyEnum::Reserved");
/// }
/// ```
#[macro_export]
macro_rules! generate_custom_enum {
    ($(#[$doc:meta])* $name:ident { $($variant:ident = $value:expr,)+ }, $unit:ident, $custom_range:expr) => {
        pastey::paste! {
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
            pub enum $name {
                $($variant,)*
                Custom( [<$name Value>] ),
                Reserved( [<$name Value>] ),
            }

            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
            pub struct [<$name Value>] { value: $unit }

            impl [<$name Value>] {
                fn new(value: $unit) -> Self {
                    Self { value }
                }

                pub fn value(&self) -> $unit {
                    self.value
                }
            }

            impl core::fmt::Display for $name {
                fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                    match self {
                        $($name::$variant => write!(f, "{}", stringify!($variant)),)*
                        $name::Custom( value ) => write!(f, "Custom({})", value.value()),
                        $name::Reserved( value ) => write!(f, "Reserved({})", value.value()),
                    }
                }
            }

            impl From<$name> for $unit {
                fn from(value: $name) -> Self {
                    match value {
                        $($name::$variant => $value,)*
                        $name::Custom( value ) => value.value(),
                        $name::Reserved( value ) => value.value(),
                    }
                }
            }

            impl From<$unit> for $name {
                fn from(value: $unit) -> Self {
                    $(
                        if value == $value {
                            return $name::$variant;
                        }
                    )*
                    if ($custom_range).contains(&value) {
                        $name::Custom( [<$name Value>]::new(value) )
                    } else {
                        $name::Reserved( [<$name Value>]::new(value) )
                    }
                }
            }
        }
    };
}

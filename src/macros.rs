//! # Internal Macros
//!
//! ## le_fields!
//!
//! On-disk headers are `#[repr(C)]` structs of zerocopy little-endian wrappers.
//! `le_fields!` gives each listed field a native-typed getter and a by-value
//! `with_` setter, so headers are built by chaining:
//!
//! ```ignore
//! impl MetaHeader {
//!     le_fields! {
//!         table_count: U32 => u32,
//!         body_len: U64 => u64,
//!     }
//! }
//!
//! let header = MetaHeader::empty().with_table_count(2).with_body_len(96);
//! assert_eq!(header.body_len(), 96);
//! ```

/// Native getters and chaining `with_` setters for little-endian header fields.
#[macro_export]
macro_rules! le_fields {
    ($($field:ident : $wrapper:ident => $native:ty),* $(,)?) => {
        $(
            #[inline]
            pub fn $field(&self) -> $native {
                self.$field.get()
            }

            ::paste::paste! {
                #[inline]
                pub fn [<with_ $field>](mut self, val: $native) -> Self {
                    self.$field = ::zerocopy::little_endian::$wrapper::new(val);
                    self
                }
            }
        )*
    };
}

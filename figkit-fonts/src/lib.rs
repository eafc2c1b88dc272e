//! Collection of `.flf` fonts to be used by the [`figkit`](https://crates.io/crates/figkit) crate.

macro_rules! fonts {
    ($($name:ident => $file_name:expr,)*) => {

        /// Included fonts
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[non_exhaustive]
        pub enum FontFile {
            $(
                #[doc = concat!("Font `", $file_name, ".flf`")]
                $name,
            )*
        }

        impl FontFile {
            /// An array containing all the variants
            pub const ALL: [Self; const{0 $(+ {_ = $file_name; 1} )*}] = [$(Self::$name),*];

            /// The contents of a font file
            #[must_use]
            pub const fn as_bytes(&self) -> &'static [u8] {
                match self {
                    $(Self::$name => include_bytes!(concat!("../fonts/", $file_name, ".flf")),)*
                }
            }

            /// The file stem
            #[must_use]
            pub const fn name(&self) -> &'static str {
                match self {
                    $(Self::$name => $file_name,)*
                }
            }

            /// Match a font name to an included font
            #[must_use]
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($file_name => Some(Self::$name),)*
                    _ => None,
                }
            }

        }

    };
}

fonts! {
    Plain => "plain",
    Tower => "tower",
    Wide => "wide",
}

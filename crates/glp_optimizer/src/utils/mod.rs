pub mod newtype_index;

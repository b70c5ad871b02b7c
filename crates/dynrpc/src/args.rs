//! Positional call arguments.

use serde::Serialize;

use crate::error::Result;
use crate::ser::to_value;
use crate::value::Value;

/// Anything that can be sent as the argument list of a call.
///
/// Arguments are numbered `1..=N` in order. `None` arguments are omitted from the
/// request but keep their position.
pub trait Args {
    fn into_values(self) -> Result<Vec<Value>>;
}

impl Args for () {
    fn into_values(self) -> Result<Vec<Value>> {
        Ok(Vec::new())
    }
}

impl Args for Vec<Value> {
    fn into_values(self) -> Result<Vec<Value>> {
        Ok(self)
    }
}

impl Args for &[Value] {
    fn into_values(self) -> Result<Vec<Value>> {
        Ok(self.to_vec())
    }
}

macro_rules! impl_args_tuple {
    ($($name:ident),+) => {
        impl<$($name: Serialize),+> Args for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_values(self) -> Result<Vec<Value>> {
                let ($($name,)+) = self;
                Ok(vec![$(to_value(&$name)?),+])
            }
        }
    };
}

impl_args_tuple!(A);
impl_args_tuple!(A, B);
impl_args_tuple!(A, B, C);
impl_args_tuple!(A, B, C, D);
impl_args_tuple!(A, B, C, D, E);
impl_args_tuple!(A, B, C, D, E, F);
impl_args_tuple!(A, B, C, D, E, F, G);
impl_args_tuple!(A, B, C, D, E, F, G, H);
impl_args_tuple!(A, B, C, D, E, F, G, H, I);
impl_args_tuple!(A, B, C, D, E, F, G, H, I, J);
impl_args_tuple!(A, B, C, D, E, F, G, H, I, J, K);
impl_args_tuple!(A, B, C, D, E, F, G, H, I, J, K, L);

#![allow(clippy::cast_precision_loss, clippy::float_cmp)]

mod categorical;
mod continuous;
mod errors;
#[cfg(feature = "gp")]
mod gp;
mod mixed;
mod observe;

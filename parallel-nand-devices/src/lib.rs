#![no_std]

#[cfg(test)]
extern crate std;

pub mod micron {
    pub mod mt29f;
}

pub use micron::mt29f::MT29F32G08ABAAA;

use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::{NativeError, NativeResult};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Reference = 0,
    Torch = 1,
}

impl BackendKind {
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Reference => "reference",
            BackendKind::Torch => "torch",
        }
    }

    pub fn parse(name: &str) -> NativeResult<Self> {
        match name {
            "reference" | "cpu" => Ok(BackendKind::Reference),
            "torch" => {
                if cfg!(feature = "torch") {
                    Ok(BackendKind::Torch)
                } else {
                    Err(NativeError::unsupported("torch backend not enabled"))
                }
            }
            other => Err(NativeError::invalid(format!("unknown backend '{other}'"))),
        }
    }
}

static BACKEND: AtomicU8 = AtomicU8::new(BackendKind::Reference as u8);

pub fn set_backend(kind: BackendKind) {
    BACKEND.store(kind as u8, Ordering::SeqCst);
}

pub fn current_backend() -> BackendKind {
    match BACKEND.load(Ordering::SeqCst) {
        x if x == BackendKind::Torch as u8 => BackendKind::Torch,
        _ => BackendKind::Reference,
    }
}

pub fn available_backends() -> Vec<&'static str> {
    let mut out = vec![BackendKind::Reference.name()];
    if cfg!(feature = "torch") {
        out.push(BackendKind::Torch.name());
    }
    out
}

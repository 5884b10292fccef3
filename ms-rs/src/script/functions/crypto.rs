//! Hashing and rot13.

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use super::{arg, Builtin};
use crate::script::construct::Construct;
use crate::script::env::Environment;
use crate::script::error::{ExceptionKind, Flow, ScriptError};
use crate::script::registry::{Arity, Function};
use crate::script::target::Target;

pub fn functions() -> Vec<Box<dyn Function>> {
    vec![
        Builtin::new(
            "rot13",
            Arity::Fixed(&[1]),
            "string {val} Returns the rot13 version of val. rot13(rot13(val)) returns val.",
            rot13,
        )
        .since_version("3.3.0")
        .foldable()
        .boxed(),
        Builtin::new(
            "md5",
            Arity::Fixed(&[1]),
            "string {val} Returns the md5 hash of val as lowercase hex. md5 is not suitable for protecting sensitive data.",
            md5_hash,
        )
        .since_version("3.3.0")
        .throws(&[ExceptionKind::PluginInternal])
        .foldable()
        .boxed(),
        Builtin::new(
            "sha1",
            Arity::Fixed(&[1]),
            "string {val} Returns the sha1 hash of val as lowercase hex.",
            sha1_hash,
        )
        .since_version("3.3.0")
        .throws(&[ExceptionKind::PluginInternal])
        .foldable()
        .boxed(),
        Builtin::new(
            "sha256",
            Arity::Fixed(&[1]),
            "string {val} Returns the sha256 hash of val as lowercase hex.",
            sha256_hash,
        )
        .since_version("3.3.0")
        .throws(&[ExceptionKind::PluginInternal])
        .foldable()
        .boxed(),
    ]
}

/// Rotate ASCII letters by 13 places; everything else passes through.
pub fn rot13_str(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'a'..='m' | 'A'..='M' => (c as u8 + 13) as char,
            'n'..='z' | 'N'..='Z' => (c as u8 - 13) as char,
            _ => c,
        })
        .collect()
}

fn hex<D: Digest>(data: &[u8]) -> String {
    D::digest(data).iter().map(|b| format!("{b:02x}")).collect()
}

/// Hash `data` with the named algorithm, as lowercase hex.
pub fn digest(algorithm: &str, data: &[u8], t: &Target) -> Result<String, ScriptError> {
    match algorithm.to_ascii_uppercase().as_str() {
        "MD5" => Ok(hex::<Md5>(data)),
        "SHA1" | "SHA-1" => Ok(hex::<Sha1>(data)),
        "SHA256" | "SHA-256" => Ok(hex::<Sha256>(data)),
        other => Err(ScriptError::new(
            ExceptionKind::PluginInternal,
            format!("no digest implementation for {other}"),
            t.clone(),
        )),
    }
}

fn rot13(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    Ok(Construct::string(rot13_str(&arg(args, 0).value()), t.clone()))
}

fn hashed(algorithm: &str, t: &Target, args: &[Construct]) -> Flow {
    let hash = digest(algorithm, arg(args, 0).value().as_bytes(), t)?;
    Ok(Construct::string(hash, t.clone()))
}

fn md5_hash(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    hashed("MD5", t, args)
}

fn sha1_hash(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    hashed("SHA-1", t, args)
}

fn sha256_hash(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    hashed("SHA-256", t, args)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

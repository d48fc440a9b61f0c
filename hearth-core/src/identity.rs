//! Local operator identity resolution.
//!
//! The console trusts the local OS user implicitly; it only resolves who
//! that is. Resolution failure is fatal to session startup, the session
//! must not start with a partial identity.

use crate::error::{HearthError, Result};
use crate::types::LocalIdentity;

/// Resolve the OS account of the current process owner.
#[cfg(unix)]
pub fn resolve_local_identity() -> Result<LocalIdentity> {
    // _SC_GETPW_R_SIZE_MAX may report -1; start small and grow on ERANGE.
    resolve_with_buffer(1024)
}

#[cfg(unix)]
fn resolve_with_buffer(initial: usize) -> Result<LocalIdentity> {
    use std::ffi::CStr;

    let uid = unsafe { libc::getuid() };

    let mut passwd: libc::passwd = unsafe { std::mem::zeroed() };
    let mut result: *mut libc::passwd = std::ptr::null_mut();
    let mut buf = vec![0 as libc::c_char; initial.max(1)];

    loop {
        let rc = unsafe {
            libc::getpwuid_r(
                uid,
                &mut passwd,
                buf.as_mut_ptr(),
                buf.len(),
                &mut result,
            )
        };
        if rc == 0 {
            break;
        }
        // Oversized entries (long GECOS fields) just need a bigger buffer.
        if rc == libc::ERANGE && buf.len() < (1 << 20) {
            let doubled = buf.len() * 2;
            buf.resize(doubled, 0 as libc::c_char);
            continue;
        }
        return Err(HearthError::IdentityLookup {
            message: format!(
                "getpwuid_r failed for uid {uid}: {}",
                std::io::Error::from_raw_os_error(rc)
            ),
        });
    }

    if result.is_null() || passwd.pw_name.is_null() {
        return Err(HearthError::IdentityLookup {
            message: format!("no passwd entry for uid {uid}"),
        });
    }

    let account = unsafe { CStr::from_ptr(passwd.pw_name) }
        .to_string_lossy()
        .into_owned();

    // The GECOS field is "Full Name,office,phone,..."; only the first
    // element is a display name.
    let display_name = if passwd.pw_gecos.is_null() {
        account.clone()
    } else {
        let gecos = unsafe { CStr::from_ptr(passwd.pw_gecos) }.to_string_lossy();
        gecos
            .split(',')
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .unwrap_or_else(|| account.clone())
    };

    Ok(LocalIdentity {
        uid: uid as u32,
        account,
        display_name,
    })
}

/// Resolve the OS account of the current process owner.
#[cfg(not(unix))]
pub fn resolve_local_identity() -> Result<LocalIdentity> {
    let account = std::env::var("USERNAME").map_err(|_| HearthError::IdentityLookup {
        message: "USERNAME environment variable is not set".into(),
    })?;
    Ok(LocalIdentity {
        uid: 0,
        account: account.clone(),
        display_name: account,
    })
}

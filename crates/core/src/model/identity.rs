use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IdentityError {
    #[error("candidate email is empty")]
    EmptyEmail,

    #[error("candidate email is not valid: {email}")]
    InvalidEmail { email: String },
}

/// The signed-in candidate an exam attempt belongs to.
///
/// Every exam call is keyed by the candidate's email; a missing or invalid
/// identity makes a section start impossible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    email: String,
}

impl Candidate {
    /// Normalize (trim, lowercase) and validate the email.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::EmptyEmail` for blank input and
    /// `IdentityError::InvalidEmail` when the address has no usable shape.
    pub fn new(email: &str) -> Result<Self, IdentityError> {
        let email = email.trim().to_ascii_lowercase();
        if email.is_empty() {
            return Err(IdentityError::EmptyEmail);
        }
        if !is_plausible_email(&email) {
            return Err(IdentityError::InvalidEmail { email });
        }
        Ok(Self { email })
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }
}

// Shape check only; the exam service is the authority on real addresses.
fn is_plausible_email(email: &str) -> bool {
    if email.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
}

// Testimonials service
// Owner-scoped CRUD with server-side required-field validation.

use crate::auth::Principal;
use crate::db::TestimonialDb;
use crate::error::ServiceError;
use crate::types::{NewTestimonial, Testimonial, TestimonialPatch};
use crate::util::validate_required;

/// Public read of one principal's testimonials. Unknown users get an empty list.
pub fn list_testimonials(db: &TestimonialDb, user_id: &str) -> Result<Vec<Testimonial>, ServiceError> {
    let rows = db.get_testimonials_for_user(user_id)?;
    Ok(rows.into_iter().map(Testimonial::from).collect())
}

/// Create a testimonial owned by `principal`.
///
/// A `userId` in the body is ignored; a mismatching one is logged since it
/// usually means a stale dashboard session.
pub fn create_testimonial(
    db: &TestimonialDb,
    principal: &Principal,
    new: NewTestimonial,
) -> Result<Testimonial, ServiceError> {
    if let Some(ref claimed) = new.user_id {
        if claimed != &principal.id {
            log::warn!(
                "Ignoring userId {:?} in create request from {}",
                claimed,
                principal.id
            );
        }
    }

    let new = NewTestimonial {
        name: new.name.trim().to_string(),
        testimony: new.testimony.trim().to_string(),
        org_name: new.org_name.trim().to_string(),
        role: new.role.trim().to_string(),
        image_url: new.image_url.trim().to_string(),
        user_id: None,
    };
    validate_new(&new)?;

    let row = db.insert_testimonial(&principal.id, &new)?;
    log::info!("Created testimonial {} for {}", row.id, principal.id);
    Ok(row.into())
}

/// Apply a partial update to a testimonial owned by `principal`.
pub fn update_testimonial(
    db: &TestimonialDb,
    principal: &Principal,
    id: i64,
    patch: TestimonialPatch,
) -> Result<Testimonial, ServiceError> {
    let trim = |value: Option<String>| value.map(|v| v.trim().to_string());
    let patch = TestimonialPatch {
        name: trim(patch.name),
        testimony: trim(patch.testimony),
        org_name: trim(patch.org_name),
        role: trim(patch.role),
        image_url: trim(patch.image_url),
    };
    validate_patch(&patch)?;

    // Update and re-read in one transaction so the response is the row as written.
    let row = db
        .with_transaction(|tx| tx.update_testimonial_for_user(id, &principal.id, &patch))?
        .ok_or(ServiceError::NotFound(id))?;
    log::info!("Updated testimonial {} for {}", id, principal.id);
    Ok(row.into())
}

/// Permanently delete a testimonial owned by `principal`.
pub fn delete_testimonial(
    db: &TestimonialDb,
    principal: &Principal,
    id: i64,
) -> Result<(), ServiceError> {
    if !db.delete_testimonial_for_user(id, &principal.id)? {
        return Err(ServiceError::NotFound(id));
    }
    log::info!("Deleted testimonial {} for {}", id, principal.id);
    Ok(())
}

fn validate_new(new: &NewTestimonial) -> Result<(), ServiceError> {
    validate_required(&new.name, "name")
        .and_then(|_| validate_required(&new.testimony, "testimony"))
        .and_then(|_| validate_required(&new.org_name, "orgName"))
        .and_then(|_| validate_required(&new.role, "role"))
        .map_err(ServiceError::Validation)
}

/// Fields present in a patch must not blank out a required value.
fn validate_patch(patch: &TestimonialPatch) -> Result<(), ServiceError> {
    let fields = [
        (&patch.name, "name"),
        (&patch.testimony, "testimony"),
        (&patch.org_name, "orgName"),
        (&patch.role, "role"),
    ];
    for (value, field) in fields {
        if let Some(value) = value {
            validate_required(value, field).map_err(ServiceError::Validation)?;
        }
    }
    Ok(())
}

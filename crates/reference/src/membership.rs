use serde::{Deserialize, Serialize};

use clubmetrics_core::{CustomerId, MembershipEnrollmentId, MembershipId};

/// A customer's enrollment in a membership tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipEnrollment {
    pub membership_enrollment_id: MembershipEnrollmentId,
    pub customer_id: CustomerId,
    pub membership_id: MembershipId,
}

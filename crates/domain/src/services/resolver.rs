//! Guest directory resolver: free-text search to editable group.

use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use shared::validation::normalize_search;

use crate::errors::RsvpError;
use crate::models::Guest;
use crate::services::directory::DirectoryClient;

/// A search match expanded to its whole family.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGroup {
    /// The guest the search string matched.
    pub anchor_id: Uuid,
    /// Every guest sharing the anchor's family id, in retrieval order.
    pub members: Vec<Guest>,
}

impl ResolvedGroup {
    /// Key used to serialize concurrent submissions for this group.
    pub fn session_key(&self) -> String {
        self.members
            .iter()
            .find(|g| g.id == self.anchor_id)
            .map(Guest::group_key)
            .unwrap_or_else(|| format!("guest-{}", self.anchor_id))
    }
}

/// Looks up invitations in the guest directory.
#[derive(Clone)]
pub struct GuestResolver {
    directory: Arc<dyn DirectoryClient>,
}

impl GuestResolver {
    pub fn new(directory: Arc<dyn DirectoryClient>) -> Self {
        Self { directory }
    }

    /// Resolves a name or email to its group.
    ///
    /// Reads the full directory on every call. Directory failures surface
    /// as `DirectoryUnavailable` and are not retried here.
    #[tracing::instrument(skip(self), fields(query_len = query.len()))]
    pub async fn resolve(&self, query: &str) -> Result<ResolvedGroup, RsvpError> {
        if normalize_search(query).is_empty() {
            return Err(RsvpError::NotFound);
        }

        let guests = self.directory.list_guests().await.map_err(|e| {
            tracing::warn!(error = %e, "Guest directory listing failed");
            RsvpError::from(e)
        })?;

        let group = resolve_in(&guests, query)?;
        tracing::info!(
            anchor_id = %group.anchor_id,
            members = group.members.len(),
            "Resolved invitation"
        );
        Ok(group)
    }
}

fn matches(guest: &Guest, needle: &str) -> bool {
    guest.full_name().to_lowercase() == needle
        || guest.first_name.trim().to_lowercase() == needle
        || guest
            .email
            .as_deref()
            .map(|email| email.trim().to_lowercase() == needle)
            .unwrap_or(false)
}

/// Resolves a search string against an already-fetched guest list.
///
/// Matches are exact and case-insensitive on "first last", first name
/// alone, or email. When matches fall in more than one group the search
/// is rejected as ambiguous instead of picking one.
pub fn resolve_in(guests: &[Guest], query: &str) -> Result<ResolvedGroup, RsvpError> {
    let needle = normalize_search(query);
    if needle.is_empty() {
        return Err(RsvpError::NotFound);
    }

    let hits: Vec<&Guest> = guests.iter().filter(|g| matches(g, &needle)).collect();
    let anchor = *hits.first().ok_or(RsvpError::NotFound)?;

    let groups: HashSet<String> = hits.iter().map(|g| g.group_key()).collect();
    if groups.len() > 1 {
        return Err(RsvpError::AmbiguousMatch(query.trim().to_string()));
    }

    let mut seen = HashSet::new();
    let members: Vec<Guest> = match &anchor.family_id {
        Some(family_id) => guests
            .iter()
            .filter(|g| g.id == anchor.id || g.family_id.as_deref() == Some(family_id.as_str()))
            .filter(|g| seen.insert(g.id))
            .cloned()
            .collect(),
        None => vec![anchor.clone()],
    };

    Ok(ResolvedGroup {
        anchor_id: anchor.id,
        members,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RsvpError;
    use crate::models::GuestFields;
    use crate::services::directory::InMemoryDirectory;
    use chrono::{Duration, Utc};
    use fake::faker::name::en::{FirstName, LastName};
    use fake::Fake;

    fn guest(first: &str, last: &str, family: Option<&str>, offset: i64) -> Guest {
        let fields = GuestFields {
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            family_id: Some(family.map(str::to_string)),
            ..Default::default()
        };
        Guest::from_fields(Uuid::new_v4(), &fields, Utc::now() + Duration::seconds(offset))
            .unwrap()
    }

    #[test]
    fn test_family_expansion() {
        let tony = guest("Tony", "Stark", Some("f1"), 0);
        let pepper = guest("Pepper", "Potts", Some("f1"), 1);
        let other = guest("Bruce", "Banner", Some("f2"), 2);
        let guests = vec![tony.clone(), other, pepper.clone()];

        let group = resolve_in(&guests, "Tony Stark").unwrap();
        assert_eq!(group.anchor_id, tony.id);
        let ids: Vec<Uuid> = group.members.iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![tony.id, pepper.id]);
        assert_eq!(group.session_key(), "f1");
    }

    #[test]
    fn test_case_insensitive_and_trimmed() {
        let tony = guest("Tony", "Stark", None, 0);
        let guests = vec![tony.clone()];
        assert_eq!(resolve_in(&guests, "  tONY stark ").unwrap().anchor_id, tony.id);
        assert_eq!(resolve_in(&guests, "TONY").unwrap().anchor_id, tony.id);
    }

    #[test]
    fn test_email_match() {
        let mut tony = guest("Tony", "Stark", None, 0);
        tony.email = Some("tony@stark.com".to_string());
        let guests = vec![tony.clone()];
        let group = resolve_in(&guests, "Tony@Stark.com").unwrap();
        assert_eq!(group.members.len(), 1);
        assert_eq!(group.session_key(), format!("guest-{}", tony.id));
    }

    #[test]
    fn test_no_partial_match() {
        let guests = vec![guest("Tony", "Stark", None, 0)];
        assert_eq!(resolve_in(&guests, "Ton"), Err(RsvpError::NotFound));
        assert_eq!(resolve_in(&guests, "Stark"), Err(RsvpError::NotFound));
        assert_eq!(resolve_in(&guests, "   "), Err(RsvpError::NotFound));
    }

    #[test]
    fn test_never_found_with_empty_group() {
        for _ in 0..20 {
            let first: String = FirstName().fake();
            let last: String = LastName().fake();
            let guests = vec![guest(&first, &last, Some("fam"), 0)];
            let result = resolve_in(&guests, "zz-no-such-guest-zz");
            assert_eq!(result, Err(RsvpError::NotFound));
        }
    }

    #[test]
    fn test_ambiguous_across_groups() {
        let a = guest("John", "Smith", Some("f1"), 0);
        let b = guest("John", "Smith", Some("f2"), 1);
        let result = resolve_in(&[a, b], "John Smith");
        assert!(matches!(result, Err(RsvpError::AmbiguousMatch(_))));
    }

    #[test]
    fn test_ties_within_group_pick_first() {
        let a = guest("John", "Smith", Some("f1"), 0);
        let b = guest("John", "Smith", Some("f1"), 1);
        let group = resolve_in(&[a.clone(), b], "john smith").unwrap();
        assert_eq!(group.anchor_id, a.id);
        assert_eq!(group.members.len(), 2);
    }

    #[tokio::test]
    async fn test_resolver_against_directory() {
        let tony = guest("Tony", "Stark", Some("f1"), 0);
        let pepper = guest("Pepper", "Potts", Some("f1"), 1);
        let dir = Arc::new(InMemoryDirectory::with_guests(vec![tony, pepper]));
        let resolver = GuestResolver::new(dir.clone());

        let group = resolver.resolve("pepper").await.unwrap();
        assert_eq!(group.members.len(), 2);

        dir.set_unavailable(true);
        let err = resolver.resolve("pepper").await.unwrap_err();
        assert!(matches!(err, RsvpError::DirectoryUnavailable(_)));
        assert!(err.is_retryable());
    }
}

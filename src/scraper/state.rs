//! The postback payload carried between requests.
//!
//! Merge rule: fields from a fresh response overwrite same-named fields
//! already held; fields the response did not emit are kept as they were.
//! Field order follows first appearance so the encoded body reads like the
//! browser's own submission.

pub const VIEWSTATE: &str = "__VIEWSTATE";
pub const VIEWSTATE_GENERATOR: &str = "__VIEWSTATEGENERATOR";
pub const EVENT_TARGET: &str = "__EVENTTARGET";
pub const EVENT_ARGUMENT: &str = "__EVENTARGUMENT";

/// Field name → value set resubmitted on every postback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatePayload {
    fields: Vec<(String, String)>,
}

impl StatePayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Overwrite `name` in place, or append it if unseen.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn merge(&mut self, fresh: StatePayload) {
        for (name, value) in fresh.fields {
            self.set(name, value);
        }
    }

    /// Copy of this payload carrying exactly one navigation directive.
    pub fn with_directive(&self, directive: &NavDirective) -> StatePayload {
        let mut out = self.clone();
        out.set(EVENT_TARGET, directive.target.as_str());
        out.set(EVENT_ARGUMENT, directive.argument.as_str());
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// `application/x-www-form-urlencoded` body.
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for StatePayload {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut payload = StatePayload::new();
        for (name, value) in iter {
            payload.set(name, value);
        }
        payload
    }
}

/// The control a postback "clicks": `__EVENTTARGET` plus optional argument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavDirective {
    pub target: String,
    pub argument: String,
}

impl NavDirective {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            argument: String::new(),
        }
    }

    /// Plain form submission with no control targeted.
    pub fn none() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overwrites_and_keeps_unseen() {
        let mut carried: StatePayload = [
            (VIEWSTATE, "old"),
            (VIEWSTATE_GENERATOR, "gen"),
            ("ctl00$PageContent$CODE_DESCRIPTIONFilter", "Food Service"),
        ]
        .into_iter()
        .collect();

        let fresh: StatePayload = [(VIEWSTATE, "new"), ("ctl00$Search", "")]
            .into_iter()
            .collect();
        carried.merge(fresh);

        assert_eq!(carried.get(VIEWSTATE), Some("new"));
        assert_eq!(carried.get(VIEWSTATE_GENERATOR), Some("gen"));
        assert_eq!(
            carried.get("ctl00$PageContent$CODE_DESCRIPTIONFilter"),
            Some("Food Service")
        );
        assert_eq!(carried.get("ctl00$Search"), Some(""));
        assert_eq!(carried.len(), 4);
    }

    #[test]
    fn test_with_directive_sets_single_target() {
        let carried: StatePayload = [(VIEWSTATE, "vs"), (EVENT_TARGET, "stale$Target")]
            .into_iter()
            .collect();

        let directive = NavDirective {
            target: "ctl00$Next".into(),
            argument: "2".into(),
        };
        let out = carried.with_directive(&directive);
        assert_eq!(out.get(EVENT_TARGET), Some("ctl00$Next"));
        assert_eq!(out.get(EVENT_ARGUMENT), Some("2"));
        assert_eq!(out.iter().filter(|(n, _)| *n == EVENT_TARGET).count(), 1);
        // the carried payload itself is untouched
        assert_eq!(carried.get(EVENT_TARGET), Some("stale$Target"));
    }

    #[test]
    fn test_encode_escapes_control_names() {
        let payload: StatePayload = [("ctl00$PageContent$Filter", "Food Service"), ("__VIEWSTATE", "a+b/c=")]
            .into_iter()
            .collect();
        assert_eq!(
            payload.encode(),
            "ctl00%24PageContent%24Filter=Food+Service&__VIEWSTATE=a%2Bb%2Fc%3D"
        );
    }
}

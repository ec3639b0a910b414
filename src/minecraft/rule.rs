use crate::json::version::meta::{Action, Rule};

use super::TARGET_OS;

pub trait ParseRule {
    /// Evaluates a platform rule list for the host OS.
    ///
    /// Last matching rule wins. A rule matches when it carries no OS
    /// predicate or its OS name equals the host name; an absent or empty
    /// rule list allows the library unconditionally. When rules are
    /// present and none matches, the library is disallowed.
    fn parse_rule(&self) -> bool;
}

impl ParseRule for [Rule] {
    fn parse_rule(&self) -> bool {
        parse_rules_for(self, TARGET_OS)
    }
}

impl ParseRule for Option<Vec<Rule>> {
    fn parse_rule(&self) -> bool {
        match self {
            Some(rules) => rules.parse_rule(),
            None => true,
        }
    }
}

pub(crate) fn parse_rules_for(rules: &[Rule], host_os: &str) -> bool {
    if rules.is_empty() {
        return true;
    }

    let mut allowed = false;
    for rule in rules {
        let matches = match &rule.os {
            None => true,
            Some(os) => os.name.as_deref().map_or(true, |name| name == host_os),
        };
        if matches {
            allowed = rule.action == Action::Allow;
        }
    }
    allowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::version::meta::Os;

    fn rule(action: Action, os: Option<&str>) -> Rule {
        Rule {
            action,
            os: os.map(|name| Os {
                name: Some(name.to_string()),
                arch: None,
            }),
        }
    }

    #[test]
    fn no_rules_allows() {
        assert!(None::<Vec<Rule>>.parse_rule());
        assert!(parse_rules_for(&[], "windows"));
    }

    #[test]
    fn last_matching_rule_wins() {
        let rules = [
            rule(Action::Allow, None),
            rule(Action::Disallow, Some("windows")),
        ];
        assert!(!parse_rules_for(&rules, "windows"));
        assert!(parse_rules_for(&rules, "linux"));
    }

    #[test]
    fn unmatched_rules_disallow() {
        let rules = [rule(Action::Allow, Some("osx"))];
        assert!(!parse_rules_for(&rules, "linux"));
        assert!(parse_rules_for(&rules, "osx"));
    }
}

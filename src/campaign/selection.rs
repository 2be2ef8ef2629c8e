// src/campaign/selection.rs
use crate::model::Person;

/// Picks who to write to: the first person, in CRM order, with an email address.
pub fn select_contact(people: &[Person]) -> Option<&Person> {
    people.iter().find(|person| person.email().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PersonId;

    fn person(id: &str, email: Option<&str>) -> Person {
        Person {
            id: PersonId::parse(id).unwrap(),
            email: email.map(str::to_string),
            first_name: None,
            last_name: None,
            belongs_to: None,
        }
    }

    #[test]
    fn first_person_with_email_wins() {
        let people = vec![
            person("1", None),
            person("2", Some("  ")),
            person("3", Some("first@cibl.ca")),
            person("4", Some("second@cibl.ca")),
        ];

        let chosen = select_contact(&people).unwrap();
        assert_eq!(chosen.id.as_str(), "3");
    }

    #[test]
    fn nobody_reachable() {
        assert!(select_contact(&[person("1", None), person("2", Some(""))]).is_none());
        assert!(select_contact(&[]).is_none());
    }
}

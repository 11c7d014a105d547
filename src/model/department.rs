use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Department {
    HumanResources,
    InformationTechnology,
    Finance,
    Sales,
    Marketing,
    Operations,
}

impl Department {
    pub fn display_name(&self) -> &'static str {
        match self {
            Department::HumanResources => "Human Resources",
            Department::InformationTechnology => "Information Technology",
            Department::Finance => "Finance",
            Department::Sales => "Sales",
            Department::Marketing => "Marketing",
            Department::Operations => "Operations",
        }
    }
}

impl TryFrom<String> for Department {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn every_department_round_trips_through_its_column_value() {
        for dept in Department::iter() {
            assert_eq!(dept.as_ref().parse::<Department>().unwrap(), dept);
        }
        assert_eq!(
            Department::InformationTechnology.as_ref(),
            "information_technology"
        );
        assert_eq!(
            Department::HumanResources.display_name(),
            "Human Resources"
        );
    }
}

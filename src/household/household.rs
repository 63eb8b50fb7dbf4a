/*
 * Epidemic Simulation Using Census Data (ESUCD)
 * Copyright (c)  2021. Sam Ralph
 *
 * This file is part of ESUCD.
 *
 * ESUCD is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, version 3 of the License.
 *
 * ESUCD is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with ESUCD.  If not, see <https://www.gnu.org/licenses/>.
 *
 */

use serde::{Deserialize, Serialize};

use crate::population::person::{Gender, Generation};

/// A canonicalised age bucket, parsed once at load time from the source
/// lookup table's free-text labels ("19 lat i mniej", "20-24", "25-29", ...).
/// Downstream code never compares bucket strings again (open question iii).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBucket {
    pub min: u32,
    pub max: u32,
}

impl AgeBucket {
    pub fn new(min: u32, max: u32) -> AgeBucket {
        AgeBucket { min, max }
    }

    pub fn contains(&self, age: u32) -> bool {
        age >= self.min && age <= self.max
    }

    /// Parses a lookup-table bucket label into a canonical [`AgeBucket`].
    /// Accepts "19 and under"/"≤19" style labels, "lo-hi" ranges, and a bare
    /// integer meaning an exact single-year bucket.
    pub fn parse(label: &str) -> Option<AgeBucket> {
        let label = label.trim();
        if let Some(rest) = label.strip_suffix("and under") {
            let hi: u32 = rest.trim().trim_end_matches('≤').trim().parse().ok()?;
            return Some(AgeBucket::new(0, hi));
        }
        if let Some(stripped) = label.strip_prefix('≤') {
            let hi: u32 = stripped.trim().parse().ok()?;
            return Some(AgeBucket::new(0, hi));
        }
        if let Some((lo, hi)) = label.split_once('-').or_else(|| label.split_once('\u{2013}')) {
            let lo: u32 = lo.trim().parse().ok()?;
            let hi: u32 = hi.trim().parse().ok()?;
            return Some(AgeBucket::new(lo, hi));
        }
        let exact: u32 = label.parse().ok()?;
        Some(AgeBucket::new(exact, exact))
    }
}

/// Family type: 0 = non-family or single occupant; 1, 2, 3 = that many
/// distinct constituent families sharing the household.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FamilyType {
    NonFamily = 0,
    OneFamily = 1,
    TwoFamilies = 2,
    ThreeFamilies = 3,
}

impl FamilyType {
    pub fn from_u8(value: u8) -> Option<FamilyType> {
        match value {
            0 => Some(FamilyType::NonFamily),
            1 => Some(FamilyType::OneFamily),
            2 => Some(FamilyType::TwoFamilies),
            3 => Some(FamilyType::ThreeFamilies),
            _ => None,
        }
    }
}

/// Generation presence flags on a household: which of young/middle/elderly
/// must appear among its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GenerationPresence {
    pub young: bool,
    pub middle: bool,
    pub elderly: bool,
}

impl GenerationPresence {
    pub fn is_present(&self, generation: Generation) -> bool {
        match generation {
            Generation::Young => self.young,
            Generation::Middle => self.middle,
            Generation::Elderly => self.elderly,
        }
    }

    pub fn present_generations(&self) -> Vec<Generation> {
        let mut out = Vec::with_capacity(3);
        if self.young {
            out.push(Generation::Young);
        }
        if self.middle {
            out.push(Generation::Middle);
        }
        if self.elderly {
            out.push(Generation::Elderly);
        }
        out
    }

    /// True when exactly one generation flag is set.
    pub fn only_one_set(&self) -> Option<Generation> {
        let present = self.present_generations();
        if present.len() == 1 {
            Some(present[0])
        } else {
            None
        }
    }
}

/// House-master archetype tag, as read from the household input row. The
/// exact string values are domain-specific relationship labels; this crate
/// treats them as opaque tags matched against the priority table in
/// `household::builder`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterArchetype(pub String);

impl MasterArchetype {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A single household row, with both its input attributes and the fields
/// filled in once its house-master has been selected and its members lodged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Household {
    pub id: u32,
    pub headcount: u32,
    pub family_type: FamilyType,
    pub presence: GenerationPresence,
    pub relationship: String,
    pub archetype: MasterArchetype,
    pub family_structure: Vec<String>,

    pub house_master_person_id: Option<u32>,
    pub master_age_bucket: Option<AgeBucket>,
    pub master_gender: Option<Gender>,
}

impl Household {
    pub fn new(
        id: u32,
        headcount: u32,
        family_type: FamilyType,
        presence: GenerationPresence,
        relationship: String,
        archetype: MasterArchetype,
        family_structure: Vec<String>,
    ) -> Household {
        Household {
            id,
            headcount,
            family_type,
            presence,
            relationship,
            archetype,
            family_structure,
            house_master_person_id: None,
            master_age_bucket: None,
            master_gender: None,
        }
    }

    pub fn has_master(&self) -> bool {
        self.house_master_person_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_bucket_parses_ranges() {
        let bucket = AgeBucket::parse("20-24").unwrap();
        assert_eq!(bucket, AgeBucket::new(20, 24));
        assert!(bucket.contains(22));
        assert!(!bucket.contains(25));
    }

    #[test]
    fn age_bucket_parses_en_dash_and_under() {
        assert_eq!(AgeBucket::parse("25\u{2013}29").unwrap(), AgeBucket::new(25, 29));
        assert_eq!(AgeBucket::parse("19 and under").unwrap(), AgeBucket::new(0, 19));
    }

    #[test]
    fn presence_only_one_set() {
        let presence = GenerationPresence { young: false, middle: true, elderly: false };
        assert_eq!(presence.only_one_set(), Some(Generation::Middle));

        let presence = GenerationPresence { young: true, middle: true, elderly: false };
        assert_eq!(presence.only_one_set(), None);
    }
}

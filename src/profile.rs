//! Per-entity-type extraction policy.

use crate::error::ConfigError;
use crate::extract::{FieldSpec, FieldTable};
use crate::filter::CosmeticPolicy;
use crate::models::FieldKind;
use crate::variants::VariantResolver;
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProfileKind {
    Equipment,
    Monsters,
}

/// Everything that differs between entity types: what to extract, how forms
/// are declared, which fields carry identity and image, and what to filter.
#[derive(Debug, Clone)]
pub struct EntityProfile {
    pub name: &'static str,
    pub fields: FieldTable,
    pub variants: VariantResolver,
    pub identity_field: &'static str,
    pub image_field: &'static str,
    pub policy: CosmeticPolicy,
    pub sentinels: Vec<String>,
    pub categories: Vec<String>,
}

impl EntityProfile {
    pub fn for_kind(kind: ProfileKind) -> Result<Self, ConfigError> {
        match kind {
            ProfileKind::Equipment => Self::equipment(),
            ProfileKind::Monsters => Self::monsters(),
        }
    }

    pub fn equipment() -> Result<Self, ConfigError> {
        use FieldKind::{Integer, PercentFloat, String as Text};
        let fields = FieldTable::new(vec![
            FieldSpec::param("id", "id", Integer)?,
            FieldSpec::param("image", "image", Text)?,
            FieldSpec::param("stab_attack", "astab", Integer)?,
            FieldSpec::param("slash_attack", "aslash", Integer)?,
            FieldSpec::param("crush_attack", "acrush", Integer)?,
            FieldSpec::param("magic_attack", "amagic", Integer)?,
            FieldSpec::param("ranged_attack", "arange", Integer)?,
            FieldSpec::param("stab_defence", "dstab", Integer)?,
            FieldSpec::param("slash_defence", "dslash", Integer)?,
            FieldSpec::param("crush_defence", "dcrush", Integer)?,
            FieldSpec::param("magic_defence", "dmagic", Integer)?,
            FieldSpec::param("ranged_defence", "drange", Integer)?,
            FieldSpec::param("melee_strength", "str", Integer)?,
            FieldSpec::param("ranged_strength", "rstr", Integer)?,
            FieldSpec::param("magic_damage", "mdmg", PercentFloat)?,
            FieldSpec::param("prayer", "prayer", Integer)?,
            FieldSpec::param("slot", "slot", Text)?,
            FieldSpec::param("speed", "speed", Integer)?,
            FieldSpec::new("attackrange", r"(?:^|\|)[ \t]*attackrange[ \t]*=[ \t]*(\d+|\w+)", Integer)?,
            FieldSpec::param("combatstyle", "combatstyle", Text)?,
        ])?;

        Ok(Self {
            name: "equipment",
            fields,
            variants: VariantResolver::new("Infobox Item", "version"),
            identity_field: "id",
            image_field: "image",
            policy: CosmeticPolicy::with_default_tables(&[
                "id",
                "image",
                "slot",
                "combatstyle",
                "speed",
                "attackrange",
            ]),
            sentinels: Vec::new(),
            categories: to_strings(&[
                "Category:Weapons",
                "Category:Weapons with Special attacks",
                "Category:Head slot items",
                "Category:Body slot items",
                "Category:Legs slot items",
                "Category:Feet slot items",
                "Category:Cape slot items",
                "Category:Neck slot items",
                "Category:Hands slot items",
                "Category:Ring slot items",
                "Category:Ammunition slot items",
                "Category:Shield slot items",
            ]),
        })
    }

    pub fn monsters() -> Result<Self, ConfigError> {
        use FieldKind::{Integer, PercentFloat, String as Text};
        let fields = FieldTable::new(vec![
            FieldSpec::param("id", "id", Integer)?,
            FieldSpec::param("image", "image", Text)?,
            FieldSpec::param("combat_level", "combat", Integer)?,
            FieldSpec::param("hitpoints", "hitpoints", Integer)?,
            FieldSpec::param("attack_level", "att", Integer)?,
            FieldSpec::param("strength_level", "str", Integer)?,
            FieldSpec::param("defence_level", "def", Integer)?,
            FieldSpec::param("magic_level", "mage", Integer)?,
            FieldSpec::param("ranged_level", "range", Integer)?,
            FieldSpec::param("attack_bonus", "attbns", Integer)?,
            FieldSpec::param("strength_bonus", "strbns", Integer)?,
            FieldSpec::param("magic_attack", "amagic", Integer)?,
            FieldSpec::param("magic_strength", "mbns", Integer)?,
            FieldSpec::param("ranged_attack", "arange", Integer)?,
            FieldSpec::param("ranged_strength", "rngbns", Integer)?,
            FieldSpec::param("stab_defence", "dstab", Integer)?,
            FieldSpec::param("slash_defence", "dslash", Integer)?,
            FieldSpec::param("crush_defence", "dcrush", Integer)?,
            FieldSpec::param("magic_defence", "dmagic", Integer)?,
            FieldSpec::param("light_ranged_defence", "dlight", Integer)?,
            FieldSpec::param("standard_ranged_defence", "dstandard", Integer)?,
            FieldSpec::param("heavy_ranged_defence", "dheavy", Integer)?,
            FieldSpec::param("elemental_weakness_percent", "elementalweaknesspercent", PercentFloat)?,
            FieldSpec::param("max_hit", "max hit", Integer)?,
            FieldSpec::param("attack_speed", "attack speed", Integer)?,
            FieldSpec::param("size", "size", Integer)?,
            FieldSpec::param("attack_style", "attack style", Text)?,
            FieldSpec::param("elemental_weakness", "elementalweaknesstype", Text)?,
        ])?;

        Ok(Self {
            name: "monsters",
            fields,
            variants: VariantResolver::new("Infobox Monster", "version"),
            identity_field: "id",
            image_field: "image",
            policy: CosmeticPolicy::with_default_tables(&["id", "image", "attack_speed", "size"]),
            sentinels: to_strings(&["Boss", "Monster", "Monsters", "Bosses"]),
            categories: to_strings(&["Category:Monsters", "Category:Bosses"]),
        })
    }

    pub fn with_max_variants(mut self, max_variants: usize) -> Result<Self, ConfigError> {
        self.variants = self.variants.with_max_variants(max_variants)?;
        Ok(self)
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        if !categories.is_empty() {
            self.categories = categories;
        }
        self
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

//! Static reference data: the resource catalog, recipes, and the quota
//! progression.
//!
//! | # | Resource | Target | Ticks | Reward |
//! |---|----------|--------|-------|--------|
//! | 1 | iron     | 50     | 9000  | grant robot |
//! | 2 | copper   | 50     | 9000  | boost energy regen |
//! | 3 | iron     | 75     | 7200  | grant robot |
//! | 4 | copper   | 100    | 10800 | level up |
//! | 5 | iron     | 150    | 9000  | grant robot |

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use refactory_types::{
    Quota, QuotaReward, Recipe, RecipeItem, ResourceKind, ResourceRecord, RewardKind,
};

/// Regeneration added by a [`RewardKind::BoostEnergyRegen`] reward.
pub const REGEN_BOOST: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// Capacity added by a [`RewardKind::LevelUp`] reward.
pub const LEVEL_UP_MAX_ENERGY: Decimal = Decimal::from_parts(500, 0, 0, false, 0);

/// Horizontal spacing between granted robots.
pub const GRANTED_ROBOT_SPACING: f64 = 50.0;

/// Display name and icon for a resource kind.
pub const fn resource_label(kind: ResourceKind) -> (&'static str, &'static str) {
    match kind {
        ResourceKind::Iron => ("Iron Ore", "⚙️"),
        ResourceKind::Copper => ("Copper Ore", "🟠"),
        ResourceKind::Circuit => ("Circuit Board", "💾"),
    }
}

/// Fresh catalog with every accumulated total at zero.
pub fn resource_catalog() -> BTreeMap<ResourceKind, ResourceRecord> {
    ResourceKind::ALL
        .into_iter()
        .map(|kind| {
            let (name, icon) = resource_label(kind);
            let record = ResourceRecord {
                kind,
                name: name.to_owned(),
                icon: icon.to_owned(),
                amount: 0,
            };
            (kind, record)
        })
        .collect()
}

/// 2 iron + 1 copper into 1 circuit over 60 ticks for 12 energy.
pub fn circuit_recipe() -> Recipe {
    Recipe {
        id: "circuit".to_owned(),
        name: "Circuit Board".to_owned(),
        inputs: vec![
            RecipeItem {
                kind: ResourceKind::Iron,
                amount: 2,
            },
            RecipeItem {
                kind: ResourceKind::Copper,
                amount: 1,
            },
        ],
        outputs: vec![RecipeItem {
            kind: ResourceKind::Circuit,
            amount: 1,
        }],
        production_time: 60,
        energy_cost: Decimal::new(12, 0),
    }
}

fn quota(resource: ResourceKind, target_amount: u64, time_limit: u64, kind: RewardKind, text: &str) -> Quota {
    Quota {
        resource,
        target_amount,
        time_limit,
        reward: QuotaReward {
            kind,
            description: text.to_owned(),
        },
    }
}

/// The fixed quota progression, in order.
pub fn default_quota_progression() -> Vec<Quota> {
    vec![
        quota(
            ResourceKind::Iron,
            50,
            9000,
            RewardKind::GrantRobot,
            "Unlock a second robot to help automate!",
        ),
        quota(
            ResourceKind::Copper,
            50,
            9000,
            RewardKind::BoostEnergyRegen,
            "Energy regeneration increased!",
        ),
        quota(ResourceKind::Iron, 75, 7200, RewardKind::GrantRobot, "Unlock a third robot!"),
        quota(
            ResourceKind::Copper,
            100,
            10800,
            RewardKind::LevelUp,
            "Level up! Max energy increased!",
        ),
        quota(ResourceKind::Iron, 150, 9000, RewardKind::GrantRobot, "Unlock a fourth robot!"),
    ]
}

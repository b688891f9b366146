use anyhow::Result;
use tracing::{debug, info, warn};

use crate::{
    engine::{System, SystemContext},
    population::GroupSelector,
    rng::SystemRng,
    scenario::{named_supplement, ManagementAction},
    world::World,
};

/// Applies the scenario's management events that fall due today. An event that
/// cannot be carried out is logged and skipped.
pub struct ManagementSystem;

impl ManagementSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ManagementSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for ManagementSystem {
    fn name(&self) -> &str {
        "management"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let due: Vec<ManagementAction> = world
            .events
            .iter()
            .filter(|event| event.is_due(ctx.day))
            .map(|event| event.action.clone())
            .collect();
        for action in &due {
            match apply(world, action) {
                Ok(()) => debug!(day = ctx.day, action = action.label(), "event applied"),
                Err(err) => warn!(
                    day = ctx.day,
                    action = action.label(),
                    error = %format!("{err:#}"),
                    "event dropped"
                ),
            }
        }
        Ok(())
    }
}

fn apply(world: &mut World, action: &ManagementAction) -> Result<()> {
    let day_of_year = world.day_of_year();
    let latitude = world.latitude();
    let herd = &mut world.herd;
    match action {
        ManagementAction::Buy(group) => {
            group.add_to(herd)?;
        }
        ManagementAction::AddCohorts(targets) => {
            herd.add_cohorts(targets, day_of_year, latitude)?;
        }
        ManagementAction::Sell { group, number } => {
            let sold = herd.sell(GroupSelector::from(*group), *number)?;
            info!(sold, "stock sold");
        }
        ManagementAction::Wean {
            group,
            number,
            females,
            males,
        } => {
            let weaned = herd.wean(GroupSelector::from(*group), *number, *females, *males)?;
            info!(weaned, "young weaned");
        }
        ManagementAction::DryOff { group, number } => {
            herd.dry_off(GroupSelector::from(*group), *number)?;
        }
        ManagementAction::Split { group, keep } => {
            herd.split(*group, *keep)?;
        }
        ManagementAction::SplitByWeight { group, live_weight } => {
            herd.split_by_weight(GroupSelector::from(*group), *live_weight)?;
        }
        ManagementAction::SplitByYoung { group } => {
            herd.split_by_young(GroupSelector::from(*group))?;
        }
        ManagementAction::Move { group, paddock } => {
            herd.move_to(GroupSelector::from(*group), paddock)?;
        }
        ManagementAction::Tag { group, tag } => {
            herd.set_tag(GroupSelector::from(*group), *tag)?;
        }
        ManagementAction::SortByTag => herd.sort_by_tag(),
        ManagementAction::Join { group, sire, days } => {
            herd.join(GroupSelector::from(*group), sire, *days)?;
        }
        ManagementAction::Shear { group, adults, young } => {
            let cut = herd.shear(GroupSelector::from(*group), *adults, *young)?;
            info!(greasy = cut.greasy, clean = cut.clean, "shorn");
            world.wool.add(cut);
        }
        ManagementAction::Feed {
            paddock,
            amount,
            feed,
            supplement,
            feed_first,
        } => {
            let supplement = match supplement {
                Some(supplement) => supplement.clone(),
                None => named_supplement(feed)?,
            };
            herd.place_supplement(paddock, *amount, &supplement, *feed_first)?;
        }
        ManagementAction::ClearFeed { paddock } => {
            let index = herd.paddock_index(paddock)?;
            if let Some(paddock) = herd.paddock_mut(index) {
                paddock.clear_supplement();
            }
        }
        ManagementAction::Castrate { group, number } => {
            herd.castrate(GroupSelector::from(*group), *number)?;
        }
    }
    Ok(())
}

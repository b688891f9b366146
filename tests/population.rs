use grazstock::{
    forage::{ForageProvider, Supplement},
    genotype::{CondScoreSystem, GenotypeOverrides, GenotypeRegistry},
    paddock::Paddock,
    population::{GroupSelector, PopulationManager, Purchase},
    weather::DailyWeather,
    StockError,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn farm() -> PopulationManager {
    let mut herd = PopulationManager::new(GenotypeRegistry::with_builtin_breeds(), CondScoreSystem::default());
    herd.add_paddock(Paddock::new("flat", 25.0).with_forage(ForageProvider::pasture("ryegrass", 2200.0, 400.0, 0.3)));
    herd.add_paddock(Paddock::new("hill", 50.0).with_forage(ForageProvider::pasture("native", 900.0, 1500.0, 0.0)));
    herd
}

fn steers(number: u32) -> Purchase {
    Purchase {
        genotype: "Angus".to_string(),
        sex: "steer".to_string(),
        number,
        age_months: 15.0,
        live_weight: Some(320.0),
        ..Purchase::default()
    }
}

#[test]
fn bought_stock_graze_and_excrete() {
    let mut herd = farm();
    let idx = herd.buy(&steers(30)).unwrap().expect("stock bought");
    assert_eq!(herd.sex_string(idx, true).unwrap(), "steers");

    let mut rng = ChaCha8Rng::seed_from_u64(11);
    herd.dynamics(&DailyWeather::default(), &mut rng).unwrap();

    let totals = herd.herd_totals();
    assert_eq!(totals.head, 30);
    assert!(totals.intake > 0.0);
    assert!(totals.methane > 0.0);
    let dung = herd.return_excretion(Some("flat")).unwrap();
    assert!(dung.total_n() > 0.0);
    let nothing = herd.return_excretion(Some("hill")).unwrap();
    assert_eq!(nothing.total_n(), 0.0);
}

#[test]
fn selling_more_than_held_sells_what_there_is() {
    let mut herd = farm();
    herd.buy(&steers(12)).unwrap();
    assert_eq!(herd.sell(GroupSelector::All, 20).unwrap(), 12);
    assert!(herd.is_empty());
    assert_eq!(herd.sell(GroupSelector::One(0), 1).unwrap_err(), StockError::InvalidGroup(0));
}

#[test]
fn custom_cross_can_be_bought() {
    let mut herd = farm();
    let overrides = GenotypeOverrides {
        name: "Angus x Friesian".to_string(),
        dam: Some("Friesian".to_string()),
        sire: Some("Angus".to_string()),
        sire_propn: 0.5,
        ..GenotypeOverrides::default()
    };
    herd.registry_mut().apply(&overrides).unwrap();
    let purchase = Purchase {
        genotype: "angus x friesian".to_string(),
        ..steers(10)
    };
    let idx = herd.buy(&purchase).unwrap().unwrap();
    assert_eq!(herd.cohort(idx).unwrap().breed(), "Angus x Friesian");
}

#[test]
fn supplement_goes_to_named_paddock() {
    let mut herd = farm();
    herd.place_supplement("hill", 200.0, &Supplement::hay(), true).unwrap();
    assert_eq!(herd.paddocks()[1].supplement_offered(), 200.0);
    assert!(matches!(
        herd.place_supplement("creek", 1.0, &Supplement::grain(), false),
        Err(StockError::UnknownPaddock(_))
    ));
}

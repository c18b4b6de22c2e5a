use mlogit::{tabulate, Dataset, Formula, ModelSpec, SYSMIS};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_tabulation_accumulates_weights() {
    init_logging();
    let mut ds = Dataset::from_rows(
        vec!["x".into(), "y".into(), "w".into()],
        &[
            vec![2.0, 1.0, 1.5],
            vec![2.0, 1.0, 2.5],
            vec![1.0, 0.0, 1.0],
            vec![2.0, 0.0, 0.0],   // zero weight: skipped
            vec![1.0, 1.0, -3.0],  // negative weight: skipped
        ],
    )
    .unwrap();
    ds.set_weight_var("w").unwrap();

    let formula = Formula::parse("tab y = x").unwrap();
    let model = ModelSpec::from_formula(&formula, &ds).unwrap();
    let tab = tabulate(&ds, &model);

    assert_eq!(tab.tables[0].levels(), vec![1.0, 2.0]);
    assert_eq!(tab.tables[0].weight_of(2.0), 4.0);
    assert_eq!(tab.dv_table.weight_of(1.0), 4.0);
    assert_eq!(tab.dv_table.weight_of(0.0), 1.0);

    // crosstab keys are (x, y), sorted ascending, one row per observed cell
    assert_eq!(tab.crosstab.n_rows(), 2);
    assert_eq!(tab.crosstab.rows()[0].key, vec![1.0, 0.0]);
    assert_eq!(tab.crosstab.rows()[1].key, vec![2.0, 1.0]);
    assert_eq!(tab.crosstab.rows()[1].weight, 4.0);
}

#[test]
fn test_sysmis_tabulates_as_a_level() {
    init_logging();
    let ds = Dataset::from_rows(
        vec!["x".into(), "y".into()],
        &[
            vec![SYSMIS, 0.0],
            vec![1.0, 1.0],
            vec![SYSMIS, 1.0],
        ],
    )
    .unwrap();

    let formula = Formula::parse("tab y = x").unwrap();
    let model = ModelSpec::from_formula(&formula, &ds).unwrap();
    let tab = tabulate(&ds, &model);

    // SYSMIS is an ordinary distinct value and, being the most negative
    // finite float, sorts ahead of everything else
    assert_eq!(tab.tables[0].n_levels(), 2);
    assert_eq!(tab.tables[0].levels()[0], SYSMIS);
    assert_eq!(tab.tables[0].weight_of(SYSMIS), 2.0);
    assert_eq!(tab.crosstab.rows()[0].key[0], SYSMIS);
}

#[test]
fn test_interaction_auto_registers_main_effect() {
    init_logging();
    let ds = Dataset::from_rows(
        vec!["a".into(), "b".into(), "y".into()],
        &[
            vec![0.0, 0.0, 0.0],
            vec![1.0, 1.0, 1.0],
            vec![0.0, 1.0, 0.0],
        ],
    )
    .unwrap();

    // b never appears as a main effect; the resolver registers it with a
    // warning and the tabulation then covers it
    let formula = Formula::parse("tab y = a a*b").unwrap();
    let model = ModelSpec::from_formula(&formula, &ds).unwrap();
    assert_eq!(model.main_effects.len(), 2);
    assert_eq!(model.interactions, vec![vec![0, 1]]);

    let tab = tabulate(&ds, &model);
    assert_eq!(tab.tables.len(), 2);
    assert_eq!(tab.crosstab.n_covariates(), 2);
}

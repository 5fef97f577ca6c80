/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

mod common;

use approx::assert_relative_eq;
use common::*;
use mrsfit_rs::fitting::{fit_model, FitConfig, FitMethod};
use mrsfit_rs::quantify::{
    calculate_area, load_default_quantification_info, QuantError, QuantificationInfo, T2Values,
    TissueFractions, QUANT_CONSTANTS,
};
use std::collections::HashMap;
use mrsfit_rs::results::{FitResult, FitSummary, Scaling, ScalingRequest, WaterScalingRequest};

const TRUE_CONC: f64 = 10.0;

fn creatine_fit() -> FitResult {
    init_logging();
    let basis = basis_of(&["Cr"]);
    let spectrum = observed(&basis, &[TRUE_CONC], 5.0, 1e-3, 100);
    let config = FitConfig::default()
        .with_window((0.2, 5.2))
        .with_baseline_order(-1);
    fit_model(&spectrum, &basis, &config).unwrap()
}

#[test]
fn test_internal_scaling_of_reference_is_one() {
    let res = creatine_fit();
    let scalings = res
        .calculate_scalings(&ScalingRequest::internal(&["Cr"]))
        .unwrap();
    let internal = res.conc(Scaling::Internal, Some(&scalings)).unwrap();
    assert_relative_eq!(internal[0], 1.0, epsilon = 1e-12);
    assert_eq!(res.conc(Scaling::Raw, None).unwrap(), res.raw_conc());
}

#[test]
fn test_scalings_must_be_computed_first() {
    let res = creatine_fit();
    assert_eq!(
        res.conc(Scaling::Internal, None),
        Err(QuantError::ScalingNotComputed("internal"))
    );
    let scalings = res
        .calculate_scalings(&ScalingRequest::internal(&["Cr"]))
        .unwrap();
    assert_eq!(
        res.conc(Scaling::Molality, Some(&scalings)),
        Err(QuantError::ScalingNotComputed("molality"))
    );
    assert_eq!(
        res.conc(Scaling::Molarity, Some(&scalings)),
        Err(QuantError::ScalingNotComputed("molarity"))
    );
}

#[test]
fn test_unknown_reference_is_rejected() {
    let res = creatine_fit();
    assert_eq!(
        res.calculate_scalings(&ScalingRequest::internal(&["GABA"])),
        Err(QuantError::ReferenceNotFound("GABA".to_string()))
    );
}

#[test]
fn test_water_scaling_recovers_phantom_concentration() {
    let res = creatine_fit();
    let consts = &*QUANT_CONSTANTS;
    // Water carrying 55.51 M of protons pairs per 10 units of creatine
    let water = water(TRUE_CONC * consts.h2o_molality / 10.0, 5.0);
    let fractions = TissueFractions::new(1.0, 0.0, 0.0).unwrap();
    // Zero echo time removes every relaxation correction
    let info = QuantificationInfo::new(0.0, consts.t2_3t, fractions, None, consts);

    let request = ScalingRequest::internal(&["Cr"]).with_water(WaterScalingRequest {
        water: &water,
        info: &info,
        reference: vec!["Cr".to_string()],
        reference_protons: 5.0,
        reference_window: None,
        consts,
    });
    let scalings = res.calculate_scalings(&request).unwrap();

    let molality = res.conc(Scaling::Molality, Some(&scalings)).unwrap();
    let molarity = res.conc(Scaling::Molarity, Some(&scalings)).unwrap();
    assert_relative_eq!(molality[0], 10.0, max_relative = 0.03);
    assert_relative_eq!(molarity[0], molality[0] * 0.78, max_relative = 1e-9);

    let details = scalings.info.unwrap();
    assert!(details.water_area > details.metabolite_area);
    assert_relative_eq!(details.metabolite_relaxation_correction, 1.0);
}

#[test]
fn test_water_scaling_tracks_relaxation_and_csf() {
    let res = creatine_fit();
    let consts = &*QUANT_CONSTANTS;
    let water = water(5000.0, 5.0);
    let request_for = |info: &QuantificationInfo| {
        let request = ScalingRequest::internal(&["Cr"]).with_water(WaterScalingRequest {
            water: &water,
            info,
            reference: vec!["Cr".to_string()],
            reference_protons: 5.0,
            reference_window: Some((2.0, 5.0)),
            consts,
        });
        res.calculate_scalings(&request).unwrap()
    };

    let t2 = consts.t2_3t;
    let plain = QuantificationInfo::new(0.0, t2, TissueFractions::new(0.6, 0.4, 0.0).unwrap(), None, consts);
    let relaxed = QuantificationInfo::new(0.03, t2, TissueFractions::new(0.6, 0.4, 0.0).unwrap(), None, consts);
    let a = request_for(&plain).molality.unwrap();
    let b = request_for(&relaxed).molality.unwrap();
    let expected = relaxed.water_relaxation() / relaxed.r_metab;
    assert_relative_eq!(b / a, expected, max_relative = 1e-9);

    let csf = QuantificationInfo::new(0.0, t2, TissueFractions::new(0.3, 0.2, 0.5).unwrap(), None, consts);
    let c = request_for(&csf).molality.unwrap();
    // CSF water counts in the numerator but is removed from the tissue volume
    assert_relative_eq!(c / a, 1.0 / 0.5, max_relative = 1e-9);
}

#[test]
fn test_default_info_for_3t() {
    let consts = &*QUANT_CONSTANTS;
    let fractions = TissueFractions::new(0.6, 0.4, 0.0).unwrap();
    let info = load_default_quantification_info(0.03, fractions, CENTRAL_FREQ, consts).unwrap();
    assert_eq!(info.t2, consts.t2_3t);
    assert!(matches!(
        load_default_quantification_info(0.03, fractions, 200.0, consts),
        Err(QuantError::UnsupportedFieldStrength(_))
    ));
}

#[test]
fn test_default_scalings_need_both_creatines() {
    let res = creatine_fit();
    assert_eq!(res.default_scalings(), Ok(None));

    let basis = basis_of(&["Cr", "PCr", "NAA"]);
    let spectrum = observed(&basis, &[4.0, 3.0, 10.0], 5.0, 1e-3, 101);
    let config = FitConfig::default().with_method(FitMethod::Init);
    let res = fit_model(&spectrum, &basis, &config).unwrap();
    let scalings = res.default_scalings().unwrap().unwrap();
    let raw = res.raw_conc();
    assert_relative_eq!(scalings.internal, 1.0 / (raw[0] + raw[1]), max_relative = 1e-12);
    assert_eq!(scalings.internal_reference, vec!["Cr".to_string(), "PCr".to_string()]);
}

#[test]
fn test_default_scalings_report_zero_creatine() {
    init_logging();
    let basis = basis_of(&["Cr", "PCr", "NAA"]);
    let spectrum = observed(&basis, &[4.0, 3.0, 10.0], 5.0, 1e-3, 103);
    let mut config = FitConfig::default()
        .with_method(FitMethod::Init)
        .with_baseline_order(-1);
    config.x0 = Some(vec![0.0, 0.0, 10.0, 5.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    let res = fit_model(&spectrum, &basis, &config).unwrap();
    assert_eq!(
        res.default_scalings(),
        Err(QuantError::ZeroReference("Cr+PCr".to_string()))
    );
}

#[test]
fn test_uncertainty_and_combinations() {
    init_logging();
    let basis = basis_of(&["Cr", "NAA", "Cho"]);
    let spectrum = observed(&basis, &[8.0, 12.0, 2.0], 4.0, 1e-2, 102);
    let res = fit_model(&spectrum, &basis, &FitConfig::default()).unwrap();

    let sd = res.perc_sd();
    assert_eq!(sd.len(), 3);
    assert!(sd.iter().all(|v| v.is_finite() && *v > 0.0 && *v < 5.0));

    let combined = res.combine(&[&["Cr", "NAA"], &["Cr", "GABA"]]);
    assert_eq!(combined.len(), 1);
    assert_eq!(combined[0].name, "Cr+NAA");
    let raw = res.raw_conc();
    assert_relative_eq!(combined[0].mean, raw[0] + raw[1], max_relative = 1e-12);
    assert!(combined[0].std.is_some_and(|s| s > 0.0));

    let summary = res.summary();
    assert_eq!(summary[2].name, "Cho");
    assert_relative_eq!(summary[2].median, raw[2]);
}

#[test]
fn test_summary_json_export() {
    let res = creatine_fit();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fit.json");
    res.save_json(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let summary: FitSummary = serde_json::from_str(&text).unwrap();
    assert_eq!(summary.method, FitMethod::Newton);
    assert_eq!(summary.metabolites[0].name, "Cr");
    assert_eq!(summary.params, res.params());
}

#[test]
fn test_summary_json_with_zero_concentration_reloads() {
    init_logging();
    let basis = basis_of(&["Cr", "Cho"]);
    let spectrum = observed(&basis, &[10.0, 0.0], 5.0, 1e-3, 104);
    let mut config = FitConfig::default()
        .with_method(FitMethod::Init)
        .with_baseline_order(-1);
    config.x0 = Some(vec![10.0, 0.0, 5.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    let res = fit_model(&spectrum, &basis, &config).unwrap();
    assert_eq!(res.perc_sd()[1], f64::INFINITY);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("zero.json");
    res.save_json(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    let summary: FitSummary = serde_json::from_str(&text).unwrap();
    assert_eq!(summary.perc_sd[1], None);
    assert!(summary.perc_sd[0].is_some_and(|v| v > 0.0));
    assert_eq!(summary, res.fit_summary());
}

#[test]
fn test_creatine_phantom_molarity_with_sampled_fit() {
    init_logging();
    let consts = &*QUANT_CONSTANTS;
    let target = 10.59;
    let window = (2.0, 5.0);
    let protons = 5.0;

    let basis = basis_of(&["Cr"]);
    let spectrum = observed(&basis, &[TRUE_CONC], 5.0, 1e-3, 105);
    let config = FitConfig::default()
        .with_window((0.2, 5.2))
        .with_baseline_order(-1)
        .with_method(FitMethod::Mh)
        .with_seed(7);
    let res = fit_model(&spectrum, &basis, &config).unwrap();

    let t2_map: HashMap<String, f64> = [
        ("H2O_GM", 0.110),
        ("H2O_WM", 0.080),
        ("H2O_CSF", 2.55),
        ("METAB", 0.160),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), *v))
    .collect();
    let t2 = T2Values::from_map(&t2_map).unwrap();
    let fractions = TissueFractions::new(0.6, 0.4, 0.0).unwrap();
    let info = QuantificationInfo::new(0.03, t2, fractions, None, consts);

    // Water amplitude chosen so the phantom's true creatine area maps to the target
    let truth = observed(&basis, &[TRUE_CONC], 5.0, 0.0, 0);
    let true_area = calculate_area(&spectrum, &truth.fid().to_vec(), Some(window)).unwrap();
    let unit_water = water(1.0, 5.0);
    let unit_area = calculate_area(&spectrum, &unit_water.fid().to_vec(), None).unwrap();
    let k = info.water_relaxation_density() / ((1.0 - fractions.csf) * info.r_metab)
        * consts.h2o_protons
        / protons
        * consts.h2o_molality;
    let amplitude = true_area * k / (TRUE_CONC * target * unit_area);
    let water = water(amplitude, 5.0);

    let request = ScalingRequest::internal(&["Cr"]).with_water(WaterScalingRequest {
        water: &water,
        info: &info,
        reference: vec!["Cr".to_string()],
        reference_protons: protons,
        reference_window: Some(window),
        consts,
    });
    let scalings = res.calculate_scalings(&request).unwrap();

    let internal = res.conc(Scaling::Internal, Some(&scalings)).unwrap();
    assert_relative_eq!(internal[0], 1.0, epsilon = 1e-9);
    let molarity = res.conc(Scaling::Molarity, Some(&scalings)).unwrap();
    assert!(
        (molarity[0] - target).abs() < 0.1,
        "molarity {} is not within 0.1 mM of {}",
        molarity[0],
        target
    );
}

use divan::{black_box, AllocProfiler};
use once_cell::sync::Lazy;
use glycochem::{
    compare::similarity::{monosaccharide_similarity, SimilarityOptions},
    compare::subgraph::maximum_common_subgraph,
    compare::topologically_equal,
    Anomer, Charge, Composition, Configuration, Glycan, IonSeries, Massive, Monosaccharide,
    Position, Stem, Substituent, SuperClass, TraversalMethod,
};

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

const FORMULAS: [&str; 5] = [
    "C6H12O6",
    "C8H15NO6",
    "C2H5NO",
    "(C6H10O5)4H2O",
    "C[13]6H12O6",
];

fn hexose(stem: Stem) -> Monosaccharide {
    Monosaccharide::new(
        Anomer::Beta,
        vec![Configuration::D],
        vec![stem],
        SuperClass::Hex,
        Some(1),
        Some(5),
    )
}

// The heptasaccharide core shared by all N-linked glycans: a GlcNAc-GlcNAc
// chitobiose stem under a trimannosyl branch point
fn n_glycan_core() -> Glycan {
    let mut glycan = Glycan::new(hexose(Stem::Glc));
    let root = glycan.root();
    glycan
        .add_substituent(root, Position::Known(2), Substituent::new("n_acetyl").unwrap(), 0)
        .unwrap();
    let glcnac = glycan
        .add_monosaccharide(root, Position::Known(4), hexose(Stem::Glc), Position::Known(1), 0)
        .unwrap();
    glycan
        .add_substituent(glcnac, Position::Known(2), Substituent::new("n_acetyl").unwrap(), 0)
        .unwrap();
    let core = glycan
        .add_monosaccharide(glcnac, Position::Known(4), hexose(Stem::Man), Position::Known(1), 0)
        .unwrap();
    let arm_a = glycan
        .add_monosaccharide(core, Position::Known(3), hexose(Stem::Man), Position::Known(1), 0)
        .unwrap();
    glycan
        .add_monosaccharide(arm_a, Position::Known(2), hexose(Stem::Man), Position::Known(1), 0)
        .unwrap();
    let arm_b = glycan
        .add_monosaccharide(core, Position::Known(6), hexose(Stem::Man), Position::Known(1), 0)
        .unwrap();
    glycan
        .add_monosaccharide(arm_b, Position::Known(2), hexose(Stem::Man), Position::Known(1), 0)
        .unwrap();
    glycan
}

static COMPOSITIONS: Lazy<Vec<Composition>> = Lazy::new(|| {
    FORMULAS
        .into_iter()
        .map(|formula| Composition::from_formula(formula).unwrap())
        .collect()
});

static GLYCAN: Lazy<Glycan> = Lazy::new(n_glycan_core);

fn main() {
    Lazy::force(&COMPOSITIONS);
    Lazy::force(&GLYCAN);
    divan::main();
}

mod atoms {
    use super::*;

    #[divan::bench]
    fn parse_formulas() {
        for formula in FORMULAS.into_iter() {
            black_box(Composition::from_formula(formula).unwrap());
        }
    }

    #[divan::bench]
    fn calculate_monoisotopic_masses() {
        for composition in COMPOSITIONS.iter() {
            black_box(composition.monoisotopic_mass());
        }
    }

    #[divan::bench]
    fn calculate_average_masses() {
        for composition in COMPOSITIONS.iter() {
            black_box(composition.average_mass());
        }
    }
}

mod structures {
    use super::*;

    #[divan::bench]
    fn build_n_glycan_core() -> Glycan {
        n_glycan_core()
    }

    #[divan::bench]
    fn calculate_glycan_mass() {
        black_box(GLYCAN.calc_mass(false, Charge::default()).unwrap());
    }

    #[divan::bench]
    fn reindex_depth_first(bencher: divan::Bencher) {
        bencher.bench_local(|| {
            let mut glycan = GLYCAN.clone();
            glycan.reindex(TraversalMethod::DepthFirst);
            glycan
        });
    }
}

mod fragmentation {
    use super::*;

    #[divan::bench]
    fn glycosidic_by_two_cleavages(bencher: divan::Bencher) {
        bencher.bench_local(|| {
            let mut glycan = GLYCAN.clone();
            glycan
                .fragments(&[IonSeries::B, IonSeries::Y], 1, 2)
                .unwrap()
        });
    }

    #[divan::bench]
    fn crossring_root(bencher: divan::Bencher) {
        bencher.bench_local(|| GLYCAN.all_crossring_fragments(GLYCAN.root()).unwrap());
    }
}

mod comparison {
    use super::*;

    #[divan::bench]
    fn topological_equality(bencher: divan::Bencher) {
        let other = n_glycan_core();
        bencher.bench_local(|| topologically_equal(black_box(&GLYCAN), black_box(&other)));
    }

    #[divan::bench]
    fn residue_similarity(bencher: divan::Bencher) {
        let other = n_glycan_core();
        let options = SimilarityOptions {
            include_children: true,
            ..SimilarityOptions::default()
        };
        bencher.bench_local(|| {
            monosaccharide_similarity(&GLYCAN, GLYCAN.root(), &other, other.root(), &options)
                .unwrap()
        });
    }

    #[divan::bench]
    fn maximum_common_subgraph_fuzzy(bencher: divan::Bencher) {
        let other = n_glycan_core();
        bencher.bench_local(|| maximum_common_subgraph(&GLYCAN, &other, false).unwrap());
    }
}

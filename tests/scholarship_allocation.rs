use admission_portal::scholarship::{
    default_slabs, read_candidates, read_slabs, ScholarshipAllocator,
};
use std::io::Cursor;

const CANDIDATES: &str = "\
id,name,academic_score,family_income,extracurricular_score,special_quota
a,Aditi,96,700000,80,no
b,Bilal,92,100000,70,yes
c,Chitra,65,150000,40,no
d,Dev,80,550000,30,no
e,Esha,55,90000,95,yes
";

#[test]
fn greedy_pass_skips_slabs_that_no_longer_fit() {
    let candidates = read_candidates(Cursor::new(CANDIDATES)).expect("candidates parse");
    let allocator = ScholarshipAllocator::new(70_000, default_slabs());

    let report = allocator.allocate(&candidates);

    // Aditi only clears gold on income; Bilal's gold no longer fits and there is
    // no fallback to silver; Dev's silver does not fit; Chitra's need award does.
    let awarded: Vec<(&str, &str)> = report
        .allocations
        .iter()
        .map(|(id, allocation)| (id.as_str(), allocation.slab.name.as_str()))
        .collect();
    assert_eq!(awarded, vec![("a", "merit-gold"), ("c", "need-based")]);
    assert_eq!(report.total_allocated, 70_000);
    assert_eq!(report.remaining_budget, 0);
    assert!(report.allocation_for("b").is_none());
    assert!(report.allocation_for("e").is_none(), "below every min score");
}

#[test]
fn allocation_is_repeatable_on_the_same_allocator() {
    let candidates = read_candidates(Cursor::new(CANDIDATES)).expect("candidates parse");
    let allocator = ScholarshipAllocator::new(70_000, default_slabs());

    let first = allocator.allocate(&candidates);
    let second = allocator.allocate(&candidates);
    assert_eq!(first, second);
}

#[test]
fn custom_slabs_from_csv_change_the_outcome() {
    let candidates = read_candidates(Cursor::new(CANDIDATES)).expect("candidates parse");
    let slabs = read_slabs(Cursor::new(
        "name,min_score,max_income,amount\n\
         bursary,50,400000,15000\n",
    ))
    .expect("slabs parse");
    let allocator = ScholarshipAllocator::new(40_000, slabs);

    let report = allocator.allocate(&candidates);

    // eligible in merit order are Bilal then Esha then Chitra; two bursaries fit
    let funded: Vec<&str> = report.allocations.keys().map(String::as_str).collect();
    assert_eq!(funded, vec!["b", "e"]);
    assert_eq!(report.remaining_budget, 10_000);
}

#[test]
fn report_serializes_for_the_api() {
    let candidates = read_candidates(Cursor::new(CANDIDATES)).expect("candidates parse");
    let report = ScholarshipAllocator::new(50_000, default_slabs()).allocate(&candidates);

    let json = serde_json::to_value(&report).expect("report serializes");
    assert_eq!(json["allocations"]["a"]["slab"]["amount"], 50_000);
    assert_eq!(json["allocations"]["a"]["candidate"]["name"], "Aditi");
    assert_eq!(json["remaining_budget"], 0);
}

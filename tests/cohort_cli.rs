use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::tempdir;

const SEGMENT_HEADER: &str = "Sample\tChromosome\tStart\tEnd\tNum_Probes\tSegment_Mean\n";

fn run_genecn(input_dir: &Path, annotation: &Path, output_dir: &Path) -> std::process::ExitStatus {
    let exe = env!("CARGO_BIN_EXE_genecn");
    Command::new(exe)
        .args([
            "-i",
            input_dir.to_str().expect("input path str"),
            "-a",
            annotation.to_str().expect("annotation path str"),
            "-o",
            output_dir.to_str().expect("output path str"),
        ])
        .status()
        .expect("run genecn cli")
}

#[test]
fn cohort_directory_produces_expected_matrix() {
    let tmp = tempdir().expect("temporary directory");
    let input_dir = tmp.path().join("segments");
    let output_dir = tmp.path().join("out");
    fs::create_dir(&input_dir).expect("create input dir");

    // Two patients: the first has chr1 coverage, the second only chr2, and a
    // blood-normal sample that must be filtered out entirely.
    let cohort = format!(
        "{SEGMENT_HEADER}\
         TCGA-A1-0001-01A-11D-0001-01\t1\t0\t100\t42\t1.0\n\
         TCGA-A1-0002-01A-11D-0001-01\t2\t0\t500\t17\t0.25\n\
         TCGA-A1-0003-10A-11D-0001-01\t1\t0\t100\t42\t2.0\n"
    );
    fs::write(input_dir.join("BRCA.snp__seg.txt"), cohort).expect("write cohort");
    fs::write(input_dir.join("MANIFEST.txt"), "not data\n").expect("write manifest");

    let annotation = tmp.path().join("annotation.csv");
    fs::write(
        &annotation,
        "Approved Symbol,Chromosome,txStart,txEnd\n\
         GENE_A,1,50,150\n\
         GENE_UN,Un_gl000220,1000,2000\n",
    )
    .expect("write annotation");

    let status = run_genecn(&input_dir, &annotation, &output_dir);
    assert!(status.success(), "CLI exited with status {status:?}");

    let matrix = fs::read_to_string(output_dir.join("BRCA.cnv.csv")).expect("read matrix");
    assert_eq!(
        matrix,
        "Symbol,Chromosome,Location,TCGA-A1-0001,TCGA-A1-0002\n\
         'GENE_A,1,50,1.0,NaN\n"
    );
    // The manifest is not a cohort.
    assert!(!output_dir.join("MANIFEST.cnv.csv").exists());
}

#[test]
fn corrupt_cohort_fails_alone_and_flags_the_run() {
    let tmp = tempdir().expect("temporary directory");
    let input_dir = tmp.path().join("segments");
    let output_dir = tmp.path().join("out");
    fs::create_dir(&input_dir).expect("create input dir");

    fs::write(
        input_dir.join("GOOD.seg.txt"),
        format!("{SEGMENT_HEADER}P1\t1\t0\t100\t9\t1.0\n"),
    )
    .expect("write good cohort");
    fs::write(
        input_dir.join("BAD.seg.txt"),
        format!("{SEGMENT_HEADER}P1\tY\t0\t100\t9\t1.0\n"),
    )
    .expect("write bad cohort");

    let annotation = tmp.path().join("annotation.csv");
    fs::write(&annotation, "Approved Symbol,Chromosome,txStart\nGENE_A,1,50\n")
        .expect("write annotation");

    let status = run_genecn(&input_dir, &annotation, &output_dir);
    assert!(!status.success(), "a failed cohort must flag the run");

    assert!(output_dir.join("GOOD.cnv.csv").exists());
    assert!(!output_dir.join("BAD.cnv.csv").exists());
}

#[test]
fn reruns_are_byte_identical() {
    let tmp = tempdir().expect("temporary directory");
    let input_dir = tmp.path().join("segments");
    let output_dir = tmp.path().join("out");
    fs::create_dir(&input_dir).expect("create input dir");

    fs::write(
        input_dir.join("ACC.seg.txt"),
        format!(
            "{SEGMENT_HEADER}\
             P2\t1\t0\t1000\t3\t-0.5\n\
             P1\t1\t200\t400\t3\t0.75\n\
             P1\tX\t0\t50\t3\t1.25\n"
        ),
    )
    .expect("write cohort");

    let annotation = tmp.path().join("annotation.csv");
    fs::write(
        &annotation,
        "Approved Symbol,Chromosome,txStart\nGENE_A,1,300\nGENE_X,X,25\n",
    )
    .expect("write annotation");

    let status = run_genecn(&input_dir, &annotation, &output_dir);
    assert!(status.success(), "CLI exited with status {status:?}");
    let first = fs::read_to_string(output_dir.join("ACC.cnv.csv")).expect("read matrix");

    let status = run_genecn(&input_dir, &annotation, &output_dir);
    assert!(status.success(), "CLI exited with status {status:?}");
    let second = fs::read_to_string(output_dir.join("ACC.cnv.csv")).expect("read matrix");

    assert_eq!(first, second);
    assert_eq!(
        first,
        "Symbol,Chromosome,Location,P1,P2\n\
         'GENE_A,1,300,0.75,-0.5\n\
         'GENE_X,23,25,1.25,NaN\n"
    );
}

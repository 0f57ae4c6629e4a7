mod common;

use common::unzip;
use invoice_stamp::{Archive, pack};

#[test]
fn entries_keep_insertion_order() {
    let mut archive = Archive::new();
    archive.push("Invoice_2_Bob.pdf", b"bob".to_vec());
    archive.push("Invoice_1_Alice.pdf", b"alice".to_vec());
    archive.push("Invoice_3_Carol.pdf", b"carol".to_vec());

    let files = unzip(&archive.pack().unwrap());
    assert_eq!(
        files,
        [
            ("Invoice_2_Bob.pdf".to_string(), b"bob".to_vec()),
            ("Invoice_1_Alice.pdf".to_string(), b"alice".to_vec()),
            ("Invoice_3_Carol.pdf".to_string(), b"carol".to_vec()),
        ]
    );
}

#[test]
fn duplicate_names_get_a_counter() {
    let mut archive = Archive::new();
    assert_eq!(archive.push("Invoice.pdf", vec![1]), "Invoice.pdf");
    assert_eq!(archive.push("Invoice.pdf", vec![2]), "Invoice_2.pdf");
    assert_eq!(archive.push("Invoice.pdf", vec![3]), "Invoice_3.pdf");
    assert_eq!(archive.push("README", vec![4]), "README");
    assert_eq!(archive.push("README", vec![5]), "README_2");
    assert_eq!(archive.len(), 5);

    let names: Vec<&str> = archive.names().collect();
    assert_eq!(
        names,
        ["Invoice.pdf", "Invoice_2.pdf", "Invoice_3.pdf", "README", "README_2"]
    );

    let files = unzip(&archive.pack().unwrap());
    assert_eq!(files[1].1, vec![2]);
}

#[test]
fn empty_archive_is_still_a_valid_zip() {
    let archive = Archive::new();
    assert!(archive.is_empty());
    let bytes = archive.pack().unwrap();
    assert!(unzip(&bytes).is_empty());
}

#[test]
fn pack_accepts_borrowed_entries() {
    let pdf = b"%PDF-1.7\n%%EOF\n".repeat(50);
    let bytes = pack([("a.pdf", pdf.as_slice()), ("b.pdf", b"x".as_slice())]).unwrap();
    let files = unzip(&bytes);
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].1, pdf);
    // Repetitive content deflates well below its raw size
    assert!(bytes.len() < pdf.len());
}

diesel::table! {
    extracted_records (id) {
        id -> Int4,
        patient_name -> Nullable<Text>,
        date_of_birth -> Nullable<Text>,
        gender -> Nullable<Text>,
        mrn -> Nullable<Text>,
        test_name -> Nullable<Text>,
        test_device -> Nullable<Text>,
        specimen_type -> Nullable<Text>,
        collection_date -> Nullable<Text>,
        tested_pathogen -> Nullable<Text>,
        test_result -> Nullable<Text>,
        reported_date -> Nullable<Text>,
        source -> Text,
        source_file -> Text,
        source_sha256 -> Nullable<Text>,
    }
}

diesel::table! {
    processing_checkpoint (id) {
        id -> Int4,
        last_processed_file -> Nullable<Text>,
        folder -> Nullable<Text>,
    }
}

//! Prompts for the two LLM calls the pipeline makes.
//!
//! Both can be overridden via [`crate::config::AutofillConfig`]; the constants
//! here are used only when no override is provided. Tests import them
//! directly so a prompt regression shows up without a live model.

/// System prompt for transcribing one page/photo of an ID document.
///
/// The output feeds both the LLM structuring call and the regex extractor,
/// so the prompt asks for plain lines, not Markdown.
pub const TRANSCRIPTION_PROMPT: &str = r#"You are an OCR engine for Indian government identity documents (Aadhaar, PAN, Voter ID, ration cards, birth certificates).

Transcribe every piece of printed text in the image:

1. Output one printed line per output line, in reading order.
2. Keep numbers exactly as printed, including the spaces inside grouped numbers (e.g. 1234 5678 9012).
3. Keep dates exactly as printed (e.g. 01/02/1990).
4. Keep labels such as "DOB", "Address:", "S/O" with their values.
5. Text in Hindi, Tamil or other scripts may be copied as printed.
6. Do NOT describe photos, QR codes, emblems or signatures.
7. Output ONLY the transcribed text. No Markdown, no fences, no commentary."#;

/// System prompt for turning OCR text into a JSON document record.
pub const STRUCTURING_PROMPT: &str = r#"You are an Indian Document Parser. Extract data into JSON.
1. Detect "DocumentType" (Aadhaar, PAN, VoterID, RationCard, BirthCertificate).
2. Extract "Name", "FatherName" (from S/O, D/O or C/O), "DOB" (DD/MM/YYYY), "Gender", and the ID numbers: "AadhaarNo", "VID", "PAN_Number", "EPIC_Number", "RationCardNo", "RegistrationNo".
3. In "Address", extract an object: {"HouseNo", "Street", "Locality", "City", "State", "Pincode"}. Do NOT put names in the address.
4. If present, also extract "Mobile" and "Email".
5. If text is in Hindi/Tamil/etc., use English for JSON keys, but keep values in original script.
6. IMPORTANT: If Aadhaar is 12 digits and VID is 16 digits, keep them separate.
7. Return ONLY valid JSON."#;

/// User turn for the structuring call.
pub fn structuring_request(ocr_text: &str) -> String {
    format!("OCR Text: {}", ocr_text)
}

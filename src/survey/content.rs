use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Section {
    /// stable key, also the prefix of every answer key in the section
    pub key: &'static str,

    /// label shown in the stepper
    pub label: &'static str,

    /// literal prompts, in ordinal order (ordinal = index + 1)
    pub questions: &'static [&'static str],
}

impl Section {
    pub fn is_personal_info(&self) -> bool {
        self.key == PERSONAL_SECTION_KEY
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn question(&self, ordinal: usize) -> Option<&'static str> {
        ordinal.checked_sub(1).and_then(|i| self.questions.get(i).copied())
    }

    /// The social media hours item is answered through PersonalInfo, not the answer map.
    pub fn is_social_media_item(&self, ordinal: usize) -> bool {
        self.key == SOCIAL_MEDIA_SECTION_KEY && ordinal == SOCIAL_MEDIA_ORDINAL
    }
}

pub const PERSONAL_SECTION_KEY: &str = "A";
pub const SOCIAL_MEDIA_SECTION_KEY: &str = "II";
pub const SOCIAL_MEDIA_ORDINAL: usize = 5;

pub static SECTIONS: [Section; 11] = [
    Section {
        key: "A",
        label: "Thông tin chung",
        questions: &[],
    },
    Section {
        key: "I",
        label: "Thái độ học tập",
        questions: &[
            "Tôi nghiêm túc đặt và theo đuổi mục tiêu học tập rõ ràng mỗi học kỳ.",
            "Tôi chịu trách nhiệm với kết quả học tập và luôn cố gắng cải thiện.",
            "Tôi kiên trì học ngay cả khi gặp khó khăn hoặc thất bại.",
            "Tôi xem việc học tại HUMG là ưu tiên hàng đầu so với hoạt động giải trí.",
            "Tôi thường tự đánh giá và điều chỉnh thái độ học tập khi thấy hiệu quả chưa cao.",
        ],
    },
    Section {
        key: "II",
        label: "Sử dụng mạng xã hội",
        questions: &[
            "Việc sử dụng mạng xã hội thường làm tôi phân tâm và trì hoãn học tập.",
            "Tôi tận dụng YouTube, blog, fanpage học thuật để tìm tài liệu và video hướng dẫn.",
            "Tôi thường dùng nhóm Facebook/Google Classroom hoặc chat Zalo lớp để trao đổi bài tập.",
            "Tôi kiểm soát tốt thời gian online, không để ảnh hưởng đến việc ôn bài và nộp bài đúng hạn.",
            "Trung bình mỗi ngày tôi dành ___ giờ cho Facebook/Instagram/TikTok.",
        ],
    },
    Section {
        key: "III",
        label: "Gia đình – Xã hội",
        questions: &[
            "Gia đình tôi thường xuyên hỏi han, động viên tiến độ học tập hàng tuần.",
            "Áp lực tài chính (học phí, chi phí sinh hoạt) từ gia đình ảnh hưởng đến thời gian học của tôi.",
            "Sự hỗ trợ tinh thần từ gia đình giúp tôi vượt khó trong học tập.",
            "Môi trường sống xung quanh (khu ký túc xá, tổ dân phố) tạo điều kiện thuận lợi cho việc học.",
            "Các hoạt động xã hội (đoàn thể, tình nguyện) tôi tham gia ảnh hưởng đến lịch học và tự học.",
        ],
    },
    Section {
        key: "IV",
        label: "Bạn bè",
        questions: &[
            "Nhóm bạn thân thường xuyên thảo luận và giải quyết bài tập khó cùng tôi.",
            "Áp lực cạnh tranh thành tích với bạn bè khiến tôi nỗ lực hơn.",
            "Tôi dễ dàng tổ chức hoặc tham gia nhóm chat (Zalo/WhatsApp) để trao đổi bài tập.",
            "Mối quan hệ bạn bè tại HUMG tạo động lực tích cực cho việc học.",
            "Bạn bè của tôi chia sẻ nguồn tài liệu và mẹo ôn tập hữu ích.",
        ],
    },
    Section {
        key: "V",
        label: "Môi trường học tập",
        questions: &[
            "Thư viện HUMG có đủ đầu sách và giờ mở cửa linh hoạt phù hợp lịch học của tôi.",
            "Phòng máy tính & phòng thí nghiệm đủ thiết bị để tôi làm bài thực hành và dự án.",
            "Các câu lạc bộ học thuật (CNTT, Kinh tế, Ngoại ngữ…) tạo cơ hội rèn luyện kỹ năng chuyên môn.",
            "Không gian tự học (phòng tự học, góc học nhóm) trong khuôn viên trường yên tĩnh và thoải mái.",
            "Hệ thống LMS (Moodle/Google Classroom) của HUMG hoạt động ổn định, dễ truy cập.",
        ],
    },
    Section {
        key: "VI",
        label: "Quản lý thời gian",
        questions: &[
            "Tôi lập kế hoạch chi tiết (lịch ôn, lịch nộp bài) cho mỗi môn học.",
            "Tôi hoàn thành nhiệm vụ học tập đúng hạn một cách tự giác.",
            "Tôi biết ưu tiên công việc học tập quan trọng trước.",
            "Tôi cân bằng tốt giữa thời gian học và các hoạt động khác.",
        ],
    },
    Section {
        key: "VII",
        label: "Tự học",
        questions: &[
            "Tôi chủ động tìm kiếm và sử dụng tài liệu ngoài giáo trình.",
            "Tôi ghi chú và hệ thống lại kiến thức ngay sau mỗi buổi học.",
            "Tôi tự đánh giá được mức độ hiểu bài và biết cách cải thiện.",
            "Tôi dễ dàng tự nghiên cứu khi gặp bài tập khó.",
        ],
    },
    Section {
        key: "VIII",
        label: "Hợp tác nhóm",
        questions: &[
            "Tôi tích cực tham gia thảo luận và chia sẻ ý kiến trong nhóm học.",
            "Tôi biết phân công và phối hợp hiệu quả với thành viên khác.",
            "Tôi lắng nghe và tiếp thu ý kiến đóng góp từ bạn bè.",
            "Tôi chủ động hỗ trợ đồng đội khi họ gặp khó khăn.",
        ],
    },
    Section {
        key: "IX",
        label: "Tư duy phản biện",
        questions: &[
            "Tôi thường đặt câu hỏi \"tại sao\" để phân tích khái niệm mới.",
            "Tôi so sánh các giải pháp khác nhau để chọn cách tối ưu.",
            "Tôi biện luận có cơ sở khi tranh luận về nội dung học tập.",
            "Tôi kiểm tra và đánh giá tính chính xác của thông tin mình đọc.",
        ],
    },
    Section {
        key: "X",
        label: "Tiếp thu & xử lý kiến thức",
        questions: &[
            "Tôi dễ dàng nắm bắt nội dung bài giảng mới và ứng dụng vào bài tập.",
            "Tôi biết tổng hợp thông tin từ nhiều nguồn để tạo hiểu biết sâu.",
            "Tôi sử dụng sơ đồ tư duy hoặc mindmap để tổ chức kiến thức.",
            "Tôi ôn tập định kỳ để duy trì và củng cố kiến thức đã học.",
        ],
    },
];

/// (value, label) pairs for every Likert item.
pub const LIKERT_OPTIONS: [(&str, &str); 5] = [
    ("1", "Hoàn toàn không đồng ý"),
    ("2", "Không đồng ý"),
    ("3", "Phân vân"),
    ("4", "Đồng ý"),
    ("5", "Hoàn toàn đồng ý"),
];

/// (value, label) pairs for the social media hours item.
pub const SOCIAL_MEDIA_OPTIONS: [(&str, &str); 5] = [
    ("5+", "Lớn hơn 5 giờ"),
    ("4", "4 giờ"),
    ("3", "3 giờ"),
    ("2", "2 giờ"),
    ("1", "1 giờ"),
];

pub const GENDER_OPTIONS: [&str; 3] = ["Nam", "Nữ", "Khác"];
pub const FACULTY_OPTIONS: [&str; 2] = ["Kinh tế", "Công nghệ Thông tin"];

pub fn section_by_key(key: &str) -> Option<(usize, &'static Section)> {
    SECTIONS.iter().enumerate().find(|(_, s)| s.key == key)
}

pub fn answer_key(section_key: &str, ordinal: usize) -> String {
    format!("{}_{}", section_key, ordinal)
}

pub fn is_likert_value(value: &str) -> bool {
    LIKERT_OPTIONS.iter().any(|(v, _)| *v == value)
}

pub fn is_social_media_value(value: &str) -> bool {
    SOCIAL_MEDIA_OPTIONS.iter().any(|(v, _)| *v == value)
}
